//! Gradient Boosting: sequences of regression trees fit to damped residuals,
//! one sequence per class (one-vs-rest) or a single one for regression.

use grove_core::{Row, Subject};
use rand::seq::index;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::fortify::fortify;
use crate::impurity::{impurity, Columns};
use crate::model::{argmax, Ensemble, ModelMeta, Prediction};
use crate::node::{Node, Tree};
use crate::params::ModelSpec;
use crate::sprout::{sprout, Context};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    meta: ModelMeta,
    /// Position `k` of a sequence was fit to what positions `0..k` left over.
    sequences: Vec<Vec<Tree>>,
}

impl GradientBoosting {
    /// Untrained model.
    pub fn new(spec: ModelSpec) -> Self {
        GradientBoosting {
            meta: ModelMeta::new(spec),
            sequences: Vec::new(),
        }
    }

    /// Create and train on `subjects`.
    pub fn create(spec: ModelSpec, subjects: &[Subject]) -> Self {
        let mut model = Self::new(spec);
        model.train(subjects);
        model
    }

    /// Reassemble a model; out-of-range hyperparameters fall back to defaults.
    pub fn from_parts(mut meta: ModelMeta, sequences: Vec<Vec<Tree>>) -> Self {
        meta.params = meta.params.sanitized();
        GradientBoosting { meta, sequences }
    }

    pub fn into_parts(self) -> (ModelMeta, Vec<Vec<Tree>>) {
        (self.meta, self.sequences)
    }

    pub fn trees(&self) -> &[Vec<Tree>] {
        &self.sequences
    }

    fn targets(&self) -> usize {
        if self.meta.is_classification() {
            self.meta.num_classes()
        } else {
            1
        }
    }

    /// Sum of the tree outputs of each sequence.
    fn scores(&self, row: &[f64]) -> Vec<f64> {
        let nn = self.meta.encoder.num_numerical();
        self.sequences
            .iter()
            .map(|seq| seq.iter().map(|t| t.predict(row, nn)).sum())
            .collect()
    }
}

/// Boost one sequence against `acc`, the per-row target still unexplained.
fn boost(
    sequence: &mut Vec<Tree>,
    work: &mut [Row],
    acc: &mut [f64],
    meta: &ModelMeta,
    rng: &mut dyn RngCore,
) {
    let params = meta.params;
    let nn = meta.encoder.num_numerical();
    let residual = meta.encoder.num_features() + 1;
    let columns = Columns {
        numerical: nn,
        outcome: residual,
        classification: false,
    };
    let features: Vec<usize> = (0..meta.encoder.num_features()).collect();
    let n = work.len();
    let take = ((params.sampling_rate * n as f64).ceil() as usize).max(1).min(n);

    for round in 0..sequence.len().max(params.max_tree) {
        for (row, a) in work.iter_mut().zip(acc.iter()) {
            row[residual] = params.learning_rate * a;
        }
        let mut sample = index::sample(rng, n, take).into_vec();
        sample.sort_unstable();

        let rows: &[Row] = &*work;
        let ctx = Context {
            rows,
            features: &features,
            columns,
            params: &params,
        };
        let baseline = impurity(rows, &sample, &columns);
        match sequence.get_mut(round) {
            Some(tree) => {
                let root = std::mem::replace(&mut tree.root, Node::Leaf { value: 0.0, impurity: 0.0 });
                tree.root = fortify(&ctx, root, &sample, baseline, 0, rng);
                tree.baseline = baseline;
            }
            None => sequence.push(Tree {
                root: sprout(&ctx, &sample, baseline, 0, rng),
                baseline,
            }),
        }
        trace!(round, baseline, "boosting round");

        let tree = &sequence[round];
        for (row, a) in rows.iter().zip(acc.iter_mut()) {
            *a -= tree.predict(row, nn);
        }
    }
}

impl Ensemble for GradientBoosting {
    fn meta(&self) -> &ModelMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ModelMeta {
        &mut self.meta
    }

    /// Each sequence is replayed round by round: existing positions are
    /// fortified against the current residuals and missing ones sprouted.
    fn grow(&mut self, rows: &[Row], rng: &mut dyn RngCore) {
        if rows.is_empty() {
            return;
        }
        let targets = self.targets();
        if self.sequences.len() < targets {
            self.sequences.resize_with(targets, Vec::new);
        }

        let outcome = self.meta.encoder.num_features();
        let mut work: Vec<Row> = rows
            .iter()
            .map(|r| {
                let mut w = r.clone();
                w.push(0.0);
                w
            })
            .collect();

        let classification = self.meta.is_classification();
        for (target, sequence) in self.sequences.iter_mut().enumerate() {
            let mut acc: Vec<f64> = rows
                .iter()
                .map(|r| {
                    if !classification {
                        r[outcome]
                    } else if r[outcome] == target as f64 {
                        1.0
                    } else {
                        0.0
                    }
                })
                .collect();
            boost(sequence, &mut work, &mut acc, &self.meta, rng);
        }
        debug!(
            sequences = self.sequences.len(),
            trees = self.tree_count(),
            rows = rows.len(),
            "gradient boosting grown"
        );
    }

    fn sequences(&self) -> Vec<&[Tree]> {
        self.sequences.iter().map(Vec::as_slice).collect()
    }

    /// Class scores clamped at zero and normalized, or the regression sum.
    fn estimate_row(&self, row: &[f64]) -> Vec<f64> {
        if self.tree_count() == 0 {
            return Vec::new();
        }
        let scores = self.scores(row);
        if !self.meta.is_classification() {
            return scores;
        }
        let clamped: Vec<f64> = scores.iter().map(|s| s.max(0.0)).collect();
        let total: f64 = clamped.iter().sum();
        if total > 0.0 {
            clamped.iter().map(|s| s / total).collect()
        } else {
            vec![1.0 / clamped.len() as f64; clamped.len()]
        }
    }

    fn predict_row(&self, row: &[f64]) -> Option<Prediction> {
        if self.tree_count() == 0 {
            return None;
        }
        let scores = self.scores(row);
        if self.meta.is_classification() {
            let class = argmax(&scores)?;
            self.meta
                .class_label(class)
                .map(|label| Prediction::Class(label.to_string()))
        } else {
            scores.first().map(|&v| Prediction::Value(v))
        }
    }
}
