//! Decision tree nodes and traversal.

use grove_core::Row;
use serde::{Deserialize, Serialize};

use crate::impurity::{goes_left, summarize, Columns};

/// A decision tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Node {
    /// Class mode or mean of the rows that reached it, with their impurity.
    Leaf { value: f64, impurity: f64 },
    /// `impurity` is the weighted impurity of the split that created the node.
    Split {
        feature: usize,
        cutoff: f64,
        impurity: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    /// Leaf summarizing the rows in `idx`.
    pub fn leaf(rows: &[Row], idx: &[usize], columns: &Columns, impurity: f64) -> Node {
        Node::Leaf {
            value: summarize(rows, idx, columns),
            impurity,
        }
    }

    pub fn impurity(&self) -> f64 {
        match self {
            Node::Leaf { impurity, .. } | Node::Split { impurity, .. } => *impurity,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    /// Leaf value reached by `row`.
    pub fn predict(&self, row: &[f64], num_numerical: usize) -> f64 {
        let mut node = self;
        loop {
            match node {
                Node::Leaf { value, .. } => return *value,
                Node::Split {
                    feature,
                    cutoff,
                    left,
                    right,
                    ..
                } => {
                    let value = row.get(*feature).copied().unwrap_or(f64::NAN);
                    node = if goes_left(value, *cutoff, *feature < num_numerical) {
                        &**left
                    } else {
                        &**right
                    };
                }
            }
        }
    }

    #[cfg(test)]
    pub fn depth(&self) -> usize {
        match self {
            Node::Leaf { .. } => 0,
            Node::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    #[cfg(test)]
    pub fn leaves(&self) -> usize {
        match self {
            Node::Leaf { .. } => 1,
            Node::Split { left, right, .. } => left.leaves() + right.leaves(),
        }
    }

    /// Add `parent_impurity - impurity` of every split to its feature's score.
    pub fn accumulate_importance(&self, parent_impurity: f64, scores: &mut [f64]) {
        if let Node::Split {
            feature,
            impurity,
            left,
            right,
            ..
        } = self
        {
            if let Some(score) = scores.get_mut(*feature) {
                *score += parent_impurity - impurity;
            }
            left.accumulate_importance(*impurity, scores);
            right.accumulate_importance(*impurity, scores);
        }
    }
}

/// A tree together with the impurity of the row set it was last grown or
/// fortified against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub root: Node,
    pub baseline: f64,
}

impl Tree {
    pub fn predict(&self, row: &[f64], num_numerical: usize) -> f64 {
        self.root.predict(row, num_numerical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump() -> Node {
        // x < 5 ? (color == 2 ? 10 : 20) : 30
        Node::Split {
            feature: 0,
            cutoff: 5.0,
            impurity: 0.2,
            left: Box::new(Node::Split {
                feature: 1,
                cutoff: 2.0,
                impurity: 0.05,
                left: Box::new(Node::Leaf { value: 10.0, impurity: 0.0 }),
                right: Box::new(Node::Leaf { value: 20.0, impurity: 0.1 }),
            }),
            right: Box::new(Node::Leaf { value: 30.0, impurity: 0.0 }),
        }
    }

    #[test]
    fn test_traversal() {
        let tree = stump();
        assert_eq!(tree.predict(&[1.0, 2.0], 1), 10.0);
        assert_eq!(tree.predict(&[1.0, 3.0], 1), 20.0);
        assert_eq!(tree.predict(&[5.0, 2.0], 1), 30.0);
        // NaN fails both `<` and `==`
        assert_eq!(tree.predict(&[f64::NAN, 2.0], 1), 30.0);
        assert_eq!(tree.predict(&[1.0, f64::NAN], 1), 20.0);
    }

    #[test]
    fn test_shape() {
        let tree = stump();
        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.leaves(), 3);
        assert!(!tree.is_leaf());
    }

    #[test]
    fn test_importance() {
        let mut scores = vec![0.0; 2];
        stump().accumulate_importance(0.5, &mut scores);
        assert!((scores[0] - 0.3).abs() < 1e-12);
        assert!((scores[1] - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_serde_tagged() {
        let json = serde_json::to_value(Node::Leaf { value: 1.0, impurity: 0.0 }).unwrap();
        assert_eq!(json["kind"], "leaf");
        let back: Node = serde_json::from_value(serde_json::to_value(stump()).unwrap()).unwrap();
        assert_eq!(back, stump());
    }
}
