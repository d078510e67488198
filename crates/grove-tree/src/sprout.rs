//! Randomized recursive tree induction.
//!
//! Cutoffs are drawn, not optimized: a numerical cutoff is a random convex
//! combination of two sampled row values, a categorical cutoff is one sampled
//! row value. The best of a bounded number of draws wins.

use grove_core::Row;
use rand::Rng;

use crate::impurity::{partition, Columns, Partition};
use crate::node::Node;
use crate::params::Hyperparameters;

/// Read-only inputs shared by every node of one induction or fortification.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    pub rows: &'a [Row],
    /// Candidate feature indices.
    pub features: &'a [usize],
    pub columns: Columns,
    pub params: &'a Hyperparameters,
}

/// A split found by [`find_split`].
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub feature: usize,
    pub cutoff: f64,
    pub partition: Partition,
}

fn draw_cutoff<R: Rng + ?Sized>(rows: &[Row], idx: &[usize], feature: usize, numerical: bool, rng: &mut R) -> f64 {
    let a = rows[idx[rng.gen_range(0..idx.len())]][feature];
    if !numerical {
        return a;
    }
    let b = rows[idx[rng.gen_range(0..idx.len())]][feature];
    let w: f64 = rng.gen();
    w * a + (1.0 - w) * b
}

/// Search for a split of `idx` whose weighted impurity is below `impurity`.
///
/// Up to `max_attempt` features are drawn, each with up to `max_attempt`
/// cutoffs. Splits leaving a branch empty are discarded; among the rest the
/// first one with the lowest weighted impurity is kept. The search stops after
/// the first feature that yields an improving split.
pub fn find_split<R: Rng + ?Sized>(ctx: &Context<'_>, idx: &[usize], impurity: f64, rng: &mut R) -> Option<Candidate> {
    if ctx.features.is_empty() || idx.is_empty() {
        return None;
    }

    let mut best: Option<Candidate> = None;
    for _ in 0..ctx.params.max_attempt {
        let feature = ctx.features[rng.gen_range(0..ctx.features.len())];
        let numerical = ctx.columns.is_numerical(feature);

        for _ in 0..ctx.params.max_attempt {
            let cutoff = draw_cutoff(ctx.rows, idx, feature, numerical, rng);
            let split = partition(ctx.rows, idx, feature, cutoff, &ctx.columns);
            if split.left.is_empty() || split.right.is_empty() {
                continue;
            }
            if best.as_ref().map_or(true, |b| split.impurity < b.partition.impurity) {
                best = Some(Candidate {
                    feature,
                    cutoff,
                    partition: split,
                });
            }
        }

        if best.as_ref().is_some_and(|b| b.partition.impurity < impurity) {
            break;
        }
    }

    best.filter(|b| b.partition.impurity < impurity)
}

/// Grow a tree over `idx`, whose impurity is `impurity`, starting at `depth`.
pub fn sprout<R: Rng + ?Sized>(ctx: &Context<'_>, idx: &[usize], impurity: f64, depth: usize, rng: &mut R) -> Node {
    if impurity > 0.0 && idx.len() > ctx.params.min_size && depth < ctx.params.max_depth {
        if let Some(Candidate {
            feature,
            cutoff,
            partition,
        }) = find_split(ctx, idx, impurity, rng)
        {
            let left = sprout(ctx, &partition.left, partition.left_impurity, depth + 1, rng);
            let right = sprout(ctx, &partition.right, partition.right_impurity, depth + 1, rng);
            return Node::Split {
                feature,
                cutoff,
                impurity: partition.impurity,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }
    Node::leaf(ctx.rows, idx, &ctx.columns, impurity)
}
