//! Impurity measures and row partitioning.
//!
//! Row sets are index lists into a shared `&[Row]`; nothing here mutates rows.

use grove_core::Row;

/// Which columns of a row a tree reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Columns {
    /// Features `0..numerical` compare with `<`, the rest with `==`.
    pub numerical: usize,
    pub outcome: usize,
    pub classification: bool,
}

impl Columns {
    pub fn is_numerical(&self, feature: usize) -> bool {
        feature < self.numerical
    }
}

/// Traversal rule shared by induction and prediction.
#[inline]
pub fn goes_left(value: f64, cutoff: f64, numerical: bool) -> bool {
    if numerical {
        value < cutoff
    } else {
        value == cutoff
    }
}

fn class_counts(rows: &[Row], idx: &[usize], column: usize) -> Vec<usize> {
    let mut counts = Vec::new();
    for &i in idx {
        let label = rows[i][column];
        if label.is_finite() && label >= 0.0 {
            let cls = label as usize;
            if cls >= counts.len() {
                counts.resize(cls + 1, 0);
            }
            counts[cls] += 1;
        }
    }
    counts
}

/// Gini impurity `1 - Σ p²`; zero for empty or pure sets.
pub fn gini(rows: &[Row], idx: &[usize], column: usize) -> f64 {
    if idx.is_empty() {
        return 0.0;
    }
    let n = idx.len() as f64;
    let sum: f64 = class_counts(rows, idx, column)
        .iter()
        .map(|&c| {
            let p = c as f64 / n;
            p * p
        })
        .sum();
    1.0 - sum
}

/// Population variance of the column, via a running mean.
pub fn mse(rows: &[Row], idx: &[usize], column: usize) -> f64 {
    if idx.is_empty() {
        return 0.0;
    }
    let mut mean = 0.0;
    let mut m2 = 0.0;
    for (k, &i) in idx.iter().enumerate() {
        let x = rows[i][column];
        let delta = x - mean;
        mean += delta / (k + 1) as f64;
        m2 += delta * (x - mean);
    }
    m2 / idx.len() as f64
}

pub fn impurity(rows: &[Row], idx: &[usize], columns: &Columns) -> f64 {
    if columns.classification {
        gini(rows, idx, columns.outcome)
    } else {
        mse(rows, idx, columns.outcome)
    }
}

/// Leaf value: the class mode (lowest index on ties) or the mean.
/// Zero for an empty set.
pub fn summarize(rows: &[Row], idx: &[usize], columns: &Columns) -> f64 {
    if idx.is_empty() {
        return 0.0;
    }
    if columns.classification {
        let counts = class_counts(rows, idx, columns.outcome);
        let mut best = 0;
        for (cls, &c) in counts.iter().enumerate() {
            if c > counts[best] {
                best = cls;
            }
        }
        best as f64
    } else {
        idx.iter().map(|&i| rows[i][columns.outcome]).sum::<f64>() / idx.len() as f64
    }
}

/// Result of splitting a row set on one `(feature, cutoff)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub left: Vec<usize>,
    pub right: Vec<usize>,
    pub left_impurity: f64,
    pub right_impurity: f64,
    /// Size-weighted mean of the branch impurities. Lower is better.
    pub impurity: f64,
}

/// Split `idx` into `[left, right]`, preserving the original order within
/// each branch.
pub fn partition(rows: &[Row], idx: &[usize], feature: usize, cutoff: f64, columns: &Columns) -> Partition {
    let numerical = columns.is_numerical(feature);
    let (left, right): (Vec<usize>, Vec<usize>) = idx
        .iter()
        .copied()
        .partition(|&i| goes_left(rows[i][feature], cutoff, numerical));

    let left_impurity = impurity(rows, &left, columns);
    let right_impurity = impurity(rows, &right, columns);
    let weighted = if idx.is_empty() {
        0.0
    } else {
        (left.len() as f64 * left_impurity + right.len() as f64 * right_impurity) / idx.len() as f64
    };

    Partition {
        left,
        right,
        left_impurity,
        right_impurity,
        impurity: weighted,
    }
}
