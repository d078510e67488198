//! Random Forest: independent trees over random feature subsets, combined by
//! majority vote or averaging.

use grove_core::{Row, Subject};
use rand::seq::SliceRandom;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::fortify::fortify;
use crate::impurity::impurity;
use crate::model::{argmax, Ensemble, ModelMeta, Prediction};
use crate::node::{Node, Tree};
use crate::params::ModelSpec;
use crate::sprout::{sprout, Context};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    meta: ModelMeta,
    trees: Vec<Tree>,
}

impl RandomForest {
    /// Untrained model.
    pub fn new(spec: ModelSpec) -> Self {
        RandomForest {
            meta: ModelMeta::new(spec),
            trees: Vec::new(),
        }
    }

    /// Create and train on `subjects`.
    pub fn create(spec: ModelSpec, subjects: &[Subject]) -> Self {
        let mut model = Self::new(spec);
        model.train(subjects);
        model
    }

    /// Reassemble a model; out-of-range hyperparameters fall back to defaults.
    pub fn from_parts(mut meta: ModelMeta, trees: Vec<Tree>) -> Self {
        meta.params = meta.params.sanitized();
        RandomForest { meta, trees }
    }

    pub fn into_parts(self) -> (ModelMeta, Vec<Tree>) {
        (self.meta, self.trees)
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }
}

impl Ensemble for RandomForest {
    fn meta(&self) -> &ModelMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ModelMeta {
        &mut self.meta
    }

    /// Existing trees are fortified over every feature; new trees are sprouted
    /// over a random `sampling_rate` share of the features.
    fn grow(&mut self, rows: &[Row], rng: &mut dyn RngCore) {
        if rows.is_empty() {
            return;
        }
        let columns = self.meta.columns();
        let params = self.meta.params;
        let idx: Vec<usize> = (0..rows.len()).collect();
        let baseline = impurity(rows, &idx, &columns);
        let all: Vec<usize> = (0..self.meta.encoder.num_features()).collect();

        let ctx = Context {
            rows,
            features: &all,
            columns,
            params: &params,
        };
        let existing = self.trees.len();
        for tree in self.trees.iter_mut() {
            let root = std::mem::replace(&mut tree.root, Node::Leaf { value: 0.0, impurity: 0.0 });
            tree.root = fortify(&ctx, root, &idx, baseline, 0, rng);
            tree.baseline = baseline;
        }

        let take = ((params.sampling_rate * all.len() as f64).ceil() as usize)
            .max(1)
            .min(all.len());
        let mut features = all.clone();
        while self.trees.len() < params.max_tree {
            features.shuffle(rng);
            let subset = &features[..take];
            let ctx = Context {
                features: subset,
                ..ctx
            };
            self.trees.push(Tree {
                root: sprout(&ctx, &idx, baseline, 0, rng),
                baseline,
            });
        }
        debug!(
            fortified = existing,
            sprouted = self.trees.len() - existing,
            rows = rows.len(),
            baseline,
            "random forest grown"
        );
    }

    fn sequences(&self) -> Vec<&[Tree]> {
        vec![&self.trees]
    }

    /// Share of trees voting for each class, or the mean tree output.
    fn estimate_row(&self, row: &[f64]) -> Vec<f64> {
        if self.trees.is_empty() {
            return Vec::new();
        }
        let nn = self.meta.encoder.num_numerical();
        let n = self.trees.len() as f64;
        if self.meta.is_classification() {
            let mut shares = vec![0.0; self.meta.num_classes()];
            for tree in &self.trees {
                let class = tree.predict(row, nn);
                if let Some(share) = shares.get_mut(class as usize) {
                    *share += 1.0 / n;
                }
            }
            shares
        } else {
            vec![self.trees.iter().map(|t| t.predict(row, nn)).sum::<f64>() / n]
        }
    }

    fn predict_row(&self, row: &[f64]) -> Option<Prediction> {
        let estimate = self.estimate_row(row);
        if self.meta.is_classification() {
            let class = argmax(&estimate)?;
            self.meta
                .class_label(class)
                .map(|label| Prediction::Class(label.to_string()))
        } else {
            estimate.first().map(|&v| Prediction::Value(v))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{Hyperparameters, Objective};
    use serde_json::json;

    fn subjects() -> Vec<Subject> {
        (0..60)
            .map(|i| {
                let x = (i % 20) as f64;
                let color = ["red", "green", "blue"][i % 3];
                json!({"x": x, "color": color, "label": if x < 10.0 { "low" } else { "high" }})
            })
            .collect()
    }

    fn spec() -> ModelSpec {
        ModelSpec::new("label", Objective::Classification)
            .with_numerical(&["x"])
            .with_categorical(&["color"])
            .with_seed(42)
            .with_params(Hyperparameters {
                max_tree: 15,
                ..Hyperparameters::default()
            })
    }

    #[test]
    fn test_create_grows_max_tree() {
        let model = RandomForest::create(spec(), &subjects());
        assert_eq!(model.trees().len(), 15);
        assert_eq!(model.tree_count(), 15);
        assert_eq!(model.meta().classes, Some(vec!["low".to_string(), "high".to_string()]));
    }

    #[test]
    fn test_untrained_predicts_nothing() {
        let model = RandomForest::new(spec());
        assert_eq!(model.predict(&json!({"x": 1})), None);
        assert!(model.estimate(&json!({"x": 1})).is_empty());
    }

    #[test]
    fn test_estimate_is_a_distribution() {
        let model = RandomForest::create(spec(), &subjects());
        let est = model.estimate(&json!({"x": 2, "color": "red"}));
        assert_eq!(est.len(), 2);
        assert!((est.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert_eq!(model.vote(&json!({"x": 2}))[0].len(), 15);
    }

    #[test]
    fn test_separable_data_predicted() {
        let model = RandomForest::create(spec(), &subjects());
        assert_eq!(model.predict(&json!({"x": 1, "color": "blue"})), Some(Prediction::Class("low".into())));
        assert_eq!(model.predict(&json!({"x": 18, "color": "red"})), Some(Prediction::Class("high".into())));
    }

    #[test]
    fn test_training_twice_keeps_tree_count() {
        let mut model = RandomForest::create(spec(), &subjects());
        model.train(&subjects());
        assert_eq!(model.trees().len(), 15);
    }

    #[test]
    fn test_empty_batch_is_a_no_op() {
        let mut model = RandomForest::create(spec(), &subjects());
        let before = model.clone();
        model.train(&[]);
        assert_eq!(model, before);
    }

    #[test]
    fn test_reassembled_skeleton_with_bad_params_still_grows() {
        let spec = ModelSpec::new("y", Objective::Regression).with_numerical(&["x"]).with_seed(6);
        let (mut meta, trees) = RandomForest::new(spec).into_parts();
        meta.params.max_attempt = 0;
        meta.params.learning_rate = 7.0;

        let mut model = RandomForest::from_parts(meta, trees);
        assert_eq!(model.meta().params, Hyperparameters::default());

        let rows: Vec<Subject> = (0..40).map(|i| json!({"x": i, "y": 2 * i})).collect();
        model.train(&rows);
        assert!(model.trees().iter().all(|t| !t.root.is_leaf()));
    }

    #[test]
    fn test_loaded_model_params_are_sanitized() {
        let mut value = serde_json::to_value(RandomForest::new(spec())).unwrap();
        value["meta"]["params"]["max_attempt"] = json!(0);
        value["meta"]["params"]["sampling_rate"] = json!(3.5);
        let model: RandomForest = serde_json::from_value(value).unwrap();
        assert_eq!(model.meta().params.max_attempt, Hyperparameters::default().max_attempt);
        assert_eq!(model.meta().params.sampling_rate, Hyperparameters::default().sampling_rate);
        assert_eq!(model.meta().params.max_tree, 15);
    }

    #[test]
    fn test_same_seed_same_model() {
        let a = RandomForest::create(spec(), &subjects());
        let b = RandomForest::create(spec(), &subjects());
        assert_eq!(a, b);
    }
}
