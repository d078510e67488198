use serde::{Deserialize, Serialize};

/// One operating point of a ROC curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RocPoint {
    pub threshold: f64,
    pub fpr: f64,
    pub tpr: f64,
}

/// ROC curve with its area, a 95% confidence interval and the cutoff that
/// maximizes Youden's J (`tpr - fpr`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocCurve {
    pub points: Vec<RocPoint>,
    pub auc: f64,
    pub ci: (f64, f64),
    pub cutoff: f64,
    pub positives: usize,
    pub negatives: usize,
}

/// Build the ROC curve of `scores` against binary `labels`.
///
/// Tied scores form a single operating point. Returns `None` when either
/// class is absent, since the curve is undefined.
pub fn roc_curve(labels: &[bool], scores: &[f64]) -> Option<RocCurve> {
    assert_eq!(labels.len(), scores.len(), "Length mismatch");
    let positives = labels.iter().filter(|&&l| l).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut pairs: Vec<(f64, bool)> = scores.iter().copied().zip(labels.iter().copied()).collect();
    pairs.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut points = vec![RocPoint {
        threshold: f64::INFINITY,
        fpr: 0.0,
        tpr: 0.0,
    }];
    let (mut tp, mut fp) = (0usize, 0usize);
    let mut i = 0;
    while i < pairs.len() {
        let threshold = pairs[i].0;
        while i < pairs.len() && pairs[i].0.total_cmp(&threshold).is_eq() {
            if pairs[i].1 {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }
        points.push(RocPoint {
            threshold,
            fpr: fp as f64 / negatives as f64,
            tpr: tp as f64 / positives as f64,
        });
    }

    // trapezoidal rule
    let auc: f64 = points
        .windows(2)
        .map(|w| (w[1].fpr - w[0].fpr) * (w[1].tpr + w[0].tpr) / 2.0)
        .sum();

    let cutoff = points
        .iter()
        .skip(1)
        .fold((f64::NEG_INFINITY, f64::NAN), |best, p| {
            let j = p.tpr - p.fpr;
            if j > best.0 {
                (j, p.threshold)
            } else {
                best
            }
        })
        .1;

    Some(RocCurve {
        ci: hanley_mcneil_ci(auc, positives, negatives),
        points,
        auc,
        cutoff,
        positives,
        negatives,
    })
}

/// 95% interval from the Hanley & McNeil (1982) standard error.
fn hanley_mcneil_ci(auc: f64, positives: usize, negatives: usize) -> (f64, f64) {
    let (np, nn) = (positives as f64, negatives as f64);
    let q1 = auc / (2.0 - auc);
    let q2 = 2.0 * auc * auc / (1.0 + auc);
    let variance = (auc * (1.0 - auc)
        + (np - 1.0) * (q1 - auc * auc)
        + (nn - 1.0) * (q2 - auc * auc))
        / (np * nn);
    let se = variance.max(0.0).sqrt();
    ((auc - 1.96 * se).max(0.0), (auc + 1.96 * se).min(1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_perfect_separation() {
        let labels = [false, false, true, true];
        let scores = [0.1, 0.2, 0.8, 0.9];
        let curve = roc_curve(&labels, &scores).unwrap();
        assert_abs_diff_eq!(curve.auc, 1.0);
        assert_abs_diff_eq!(curve.cutoff, 0.8);
        assert!(curve.ci.0 <= 1.0 && curve.ci.1 <= 1.0);
    }

    #[test]
    fn test_ties_collapse_to_diagonal() {
        let labels = [true, false, true, false];
        let curve = roc_curve(&labels, &[0.5; 4]).unwrap();
        assert_eq!(curve.points.len(), 2);
        assert_abs_diff_eq!(curve.auc, 0.5);
    }

    #[test]
    fn test_inverted_scores() {
        let labels = [true, true, false, false];
        let scores = [0.1, 0.2, 0.8, 0.9];
        assert_abs_diff_eq!(roc_curve(&labels, &scores).unwrap().auc, 0.0);
    }

    #[test]
    fn test_single_class_is_undefined() {
        assert!(roc_curve(&[true, true], &[0.2, 0.4]).is_none());
        assert!(roc_curve(&[false], &[0.3]).is_none());
    }
}
