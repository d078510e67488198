//! Incremental update of an existing tree with a new batch of rows.
//!
//! Split nodes keep their rule unless the new rows make it worse than the
//! impurity recorded when the node was created; leaves are re-summarized or
//! re-grown. Empty row sets leave a subtree untouched.

use rand::Rng;
use tracing::trace;

use crate::impurity::partition;
use crate::node::Node;
use crate::sprout::{find_split, sprout, Candidate, Context};

/// Adapt `node` to the rows in `idx`, whose impurity is `impurity`.
pub fn fortify<R: Rng + ?Sized>(
    ctx: &Context<'_>,
    node: Node,
    idx: &[usize],
    impurity: f64,
    depth: usize,
    rng: &mut R,
) -> Node {
    if idx.is_empty() {
        return node;
    }
    let params = ctx.params;

    match node {
        Node::Leaf {
            impurity: stored, ..
        } => {
            if idx.len() <= params.min_size {
                node
            } else if impurity > stored && depth < params.max_depth {
                sprout(ctx, idx, impurity, depth, rng)
            } else {
                Node::leaf(ctx.rows, idx, &ctx.columns, impurity)
            }
        }
        Node::Split {
            feature,
            cutoff,
            impurity: stored,
            left,
            right,
        } => {
            if depth >= params.max_depth {
                if idx.len() > params.min_size {
                    trace!(depth, rows = idx.len(), "pruning split beyond depth limit");
                    return Node::leaf(ctx.rows, idx, &ctx.columns, impurity);
                }
                return Node::Split {
                    feature,
                    cutoff,
                    impurity: stored,
                    left,
                    right,
                };
            }

            let split = partition(ctx.rows, idx, feature, cutoff, &ctx.columns);
            if split.impurity > stored && impurity > 0.0 && idx.len() > params.min_size {
                if let Some(candidate) = find_split(ctx, idx, split.impurity, rng) {
                    let old = Node::Split {
                        feature,
                        cutoff,
                        impurity: stored,
                        left,
                        right,
                    };
                    return graft(ctx, old, candidate, depth, rng);
                }
            }

            let left = fortify(ctx, *left, &split.left, split.left_impurity, depth + 1, rng);
            let right = fortify(ctx, *right, &split.right, split.right_impurity, depth + 1, rng);
            Node::Split {
                feature,
                cutoff,
                impurity: stored,
                left: Box::new(left),
                right: Box::new(right),
            }
        }
    }
}

/// Adopt `candidate` as the node. The old subtree moves under the purer
/// branch and is fortified there; the other branch is grown fresh.
fn graft<R: Rng + ?Sized>(ctx: &Context<'_>, old: Node, candidate: Candidate, depth: usize, rng: &mut R) -> Node {
    let Candidate {
        feature,
        cutoff,
        partition: p,
    } = candidate;
    trace!(depth, feature, cutoff, impurity = p.impurity, "grafting subtree under new split");

    let (left, right) = if p.left_impurity <= p.right_impurity {
        (
            fortify(ctx, old, &p.left, p.left_impurity, depth + 1, rng),
            sprout(ctx, &p.right, p.right_impurity, depth + 1, rng),
        )
    } else {
        (
            sprout(ctx, &p.left, p.left_impurity, depth + 1, rng),
            fortify(ctx, old, &p.right, p.right_impurity, depth + 1, rng),
        )
    };

    Node::Split {
        feature,
        cutoff,
        impurity: p.impurity,
        left: Box::new(left),
        right: Box::new(right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impurity::{impurity, Columns};
    use crate::params::Hyperparameters;
    use crate::sprout::tests::{blob_rows, check_invariants, CLS};
    use grove_core::Row;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const FEATURES: [usize; 3] = [0, 1, 2];

    fn ctx<'a>(rows: &'a [Row], params: &'a Hyperparameters) -> Context<'a> {
        Context {
            rows,
            features: &FEATURES,
            columns: CLS,
            params,
        }
    }

    fn all(rows: &[Row]) -> Vec<usize> {
        (0..rows.len()).collect()
    }

    #[test]
    fn test_matching_rows_leave_tree_unchanged() {
        let rows = blob_rows(100, 11);
        let params = Hyperparameters::default();
        let ctx = ctx(&rows, &params);
        let idx = all(&rows);
        let total = impurity(&rows, &idx, &CLS);

        let mut rng = StdRng::seed_from_u64(5);
        let tree = sprout(&ctx, &idx, total, 0, &mut rng);
        let mut rng = StdRng::seed_from_u64(5);
        let again = fortify(&ctx, tree.clone(), &idx, total, 0, &mut rng);
        assert_eq!(again, tree);
    }

    #[test]
    fn test_empty_rows_are_a_no_op() {
        let rows = blob_rows(40, 12);
        let params = Hyperparameters::default();
        let ctx = ctx(&rows, &params);
        let idx = all(&rows);
        let mut rng = StdRng::seed_from_u64(1);
        let tree = sprout(&ctx, &idx, impurity(&rows, &idx, &CLS), 0, &mut rng);
        assert_eq!(fortify(&ctx, tree.clone(), &[], 0.5, 0, &mut rng), tree);
    }

    #[test]
    fn test_leaf_regrows_on_impure_rows() {
        let rows = blob_rows(80, 13);
        let params = Hyperparameters::default();
        let ctx = ctx(&rows, &params);
        let idx = all(&rows);
        let total = impurity(&rows, &idx, &CLS);
        let stale = Node::Leaf { value: 0.0, impurity: 0.0 };
        let mut rng = StdRng::seed_from_u64(2);
        let grown = fortify(&ctx, stale, &idx, total, 0, &mut rng);
        assert!(!grown.is_leaf());
        check_invariants(&grown, &rows, &idx, total, &CLS);
    }

    #[test]
    fn test_leaf_resummarizes_when_not_worse() {
        let rows: Vec<Row> = vec![vec![1.0, 0.0, 0.0, 1.0]; 4];
        let params = Hyperparameters::default();
        let ctx = ctx(&rows, &params);
        let stale = Node::Leaf { value: 0.0, impurity: 0.3 };
        let mut rng = StdRng::seed_from_u64(2);
        let fresh = fortify(&ctx, stale, &all(&rows), 0.0, 0, &mut rng);
        assert_eq!(fresh, Node::Leaf { value: 1.0, impurity: 0.0 });
    }

    #[test]
    fn test_small_leaf_kept() {
        let rows: Vec<Row> = vec![vec![1.0, 0.0, 0.0, 1.0], vec![2.0, 0.0, 0.0, 0.0]];
        let params = Hyperparameters {
            min_size: 2,
            ..Hyperparameters::default()
        };
        let ctx = ctx(&rows, &params);
        let leaf = Node::Leaf { value: 0.0, impurity: 0.0 };
        let mut rng = StdRng::seed_from_u64(2);
        assert_eq!(fortify(&ctx, leaf.clone(), &[0, 1], 0.5, 0, &mut rng), leaf);
    }

    #[test]
    fn test_split_beyond_depth_is_pruned() {
        let rows = blob_rows(30, 14);
        let params = Hyperparameters {
            max_depth: 1,
            ..Hyperparameters::default()
        };
        let ctx = ctx(&rows, &params);
        let deep = Node::Split {
            feature: 0,
            cutoff: 5.0,
            impurity: 0.1,
            left: Box::new(Node::Leaf { value: 0.0, impurity: 0.0 }),
            right: Box::new(Node::Leaf { value: 1.0, impurity: 0.0 }),
        };
        let idx = all(&rows);
        let mut rng = StdRng::seed_from_u64(2);
        let pruned = fortify(&ctx, deep, &idx, 0.4, 1, &mut rng);
        assert!(pruned.is_leaf());
        assert_eq!(pruned.impurity(), 0.4);
    }

    #[test]
    fn test_degraded_split_is_replaced() {
        // Old rule `x < 5` says nothing about the new rows, which split on y.
        let rows: Vec<Row> = (0..40)
            .map(|i| {
                let x = (i % 10) as f64;
                let y = (i / 4) as f64;
                vec![x, y, 0.0, if y < 5.0 { 0.0 } else { 1.0 }]
            })
            .collect();
        let columns = Columns {
            numerical: 2,
            outcome: 3,
            classification: true,
        };
        let params = Hyperparameters {
            max_attempt: 30,
            ..Hyperparameters::default()
        };
        let features = [0, 1];
        let ctx = Context {
            rows: &rows,
            features: &features,
            columns,
            params: &params,
        };
        let old = Node::Split {
            feature: 0,
            cutoff: 5.0,
            impurity: 0.0,
            left: Box::new(Node::Leaf { value: 0.0, impurity: 0.0 }),
            right: Box::new(Node::Leaf { value: 1.0, impurity: 0.0 }),
        };
        let idx = all(&rows);
        let total = impurity(&rows, &idx, &columns);
        let mut rng = StdRng::seed_from_u64(8);
        let tree = fortify(&ctx, old, &idx, total, 0, &mut rng);

        match &tree {
            Node::Split { feature, .. } => assert_eq!(*feature, 1),
            leaf => panic!("expected a split, got {leaf:?}"),
        }
        let correct = rows.iter().filter(|r| tree.predict(r, 2) == r[3]).count();
        assert_eq!(correct, rows.len());
    }
}
