//! The model façade shared by both ensemble strategies.

use grove_core::subject::{self, Subject};
use grove_core::{categorical_value, numeric_value, tabulate, Encoder, GroveError, GroveResult, Row};
use grove_metrics::{accuracy, f1_macro, f1_per_class, mae, mse, r2_score, rmse, roc_curve, RocCurve};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::impurity::Columns;
use crate::node::Tree;
use crate::params::{Hyperparameters, ModelSpec, Objective};

/// Everything about a model except its trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMeta {
    /// Restored before every training call.
    pub seed: u64,
    pub outcome: String,
    pub encoder: Encoder,
    /// Class labels in order of first appearance; `None` for regression.
    pub classes: Option<Vec<String>>,
    pub params: Hyperparameters,
}

impl ModelMeta {
    pub fn new(spec: ModelSpec) -> Self {
        ModelMeta {
            seed: spec.seed.unwrap_or_else(rand::random),
            outcome: spec.outcome,
            encoder: Encoder::new(spec.numerical, spec.categorical),
            classes: match spec.objective {
                Objective::Classification => Some(Vec::new()),
                Objective::Regression => None,
            },
            params: spec.params.sanitized(),
        }
    }

    pub fn is_classification(&self) -> bool {
        self.classes.is_some()
    }

    pub fn num_classes(&self) -> usize {
        self.classes.as_ref().map_or(0, Vec::len)
    }

    /// Column layout of rows built by [`ModelMeta::tabulate`].
    pub fn columns(&self) -> Columns {
        Columns {
            numerical: self.encoder.num_numerical(),
            outcome: self.encoder.num_features(),
            classification: self.is_classification(),
        }
    }

    pub fn class_label(&self, index: usize) -> Option<&str> {
        self.classes.as_ref()?.get(index).map(String::as_str)
    }

    /// Encoded outcome of `subject`: class index or numeric target, `NaN`
    /// when missing or unknown.
    pub fn outcome_value(&self, subject: &Subject) -> f64 {
        outcome_of(&self.classes, &self.outcome, subject)
    }

    /// Rows for every subject with a usable outcome, registering new
    /// categories and class labels.
    pub fn tabulate(&mut self, subjects: &[Subject]) -> Vec<Row> {
        let outcome = self.outcome.as_str();
        let labelled: Vec<Subject> = match &mut self.classes {
            Some(classes) => subjects
                .iter()
                .filter(|s| match subject::get(s, outcome) {
                    None | Some(Value::Null) => false,
                    Some(v) => {
                        let label = categorical_value(Some(v));
                        if !classes.contains(&label) {
                            classes.push(label);
                        }
                        true
                    }
                })
                .cloned()
                .collect(),
            None => subjects
                .iter()
                .filter(|s| numeric_value(subject::get(s, outcome)).is_finite())
                .cloned()
                .collect(),
        };

        let classes = &self.classes;
        let target = |s: &Subject| outcome_of(classes, outcome, s);
        tabulate(&labelled, &mut self.encoder, &[&target])
    }

    /// Rows from pre-encoded features and raw outcomes. Rows whose outcome
    /// is not finite are skipped, like subjects without a usable outcome.
    pub fn rows_from(&mut self, x: &[Row], y: &[f64]) -> GroveResult<Vec<Row>> {
        if x.len() != y.len() {
            return Err(GroveError::DimensionMismatch {
                expected: x.len(),
                got: y.len(),
            });
        }
        let width = self.encoder.num_features();
        let mut rows = Vec::with_capacity(x.len());
        for (features, &target) in x.iter().zip(y) {
            if features.len() != width {
                return Err(GroveError::DimensionMismatch {
                    expected: width,
                    got: features.len(),
                });
            }
            if !target.is_finite() {
                continue;
            }
            let outcome = match &mut self.classes {
                Some(classes) => {
                    let label = number_label(target);
                    match classes.iter().position(|c| *c == label) {
                        Some(i) => i as f64,
                        None => {
                            classes.push(label);
                            (classes.len() - 1) as f64
                        }
                    }
                }
                None => target,
            };
            let mut row = features.clone();
            row.push(outcome);
            rows.push(row);
        }
        Ok(rows)
    }
}

fn outcome_of(classes: &Option<Vec<String>>, outcome: &str, subject: &Subject) -> f64 {
    let value = subject::get(subject, outcome);
    match classes {
        Some(classes) => {
            if matches!(value, None | Some(Value::Null)) {
                return f64::NAN;
            }
            let label = categorical_value(value);
            classes
                .iter()
                .position(|c| *c == label)
                .map_or(f64::NAN, |i| i as f64)
        }
        None => numeric_value(value),
    }
}

/// Canonical label text of a numeric class, `1.0` becoming `"1"`.
fn number_label(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

/// Answer of [`Ensemble::predict`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Prediction {
    Class(String),
    Value(f64),
}

impl Prediction {
    pub fn as_class(&self) -> Option<&str> {
        match self {
            Prediction::Class(c) => Some(c),
            Prediction::Value(_) => None,
        }
    }

    pub fn as_value(&self) -> Option<f64> {
        match self {
            Prediction::Value(v) => Some(*v),
            Prediction::Class(_) => None,
        }
    }
}

/// Answer of [`Ensemble::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Validation {
    Classification {
        count: usize,
        accuracy: f64,
        /// F1 per class label, in class order.
        f1: Vec<(String, f64)>,
        macro_f1: f64,
    },
    Regression {
        count: usize,
        r2: f64,
        mae: f64,
        rmse: f64,
        mse: f64,
    },
}

/// One-vs-rest ROC curve of one class; `None` when the validation set lacks
/// either positives or negatives for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocResult {
    pub class: String,
    pub curve: Option<RocCurve>,
}

/// Index of the largest value, the lowest index winning ties.
pub(crate) fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, &v) in values.iter().enumerate() {
        if best.map_or(true, |b| v > values[b]) {
            best = Some(i);
        }
    }
    best
}

/// Operations shared by [`crate::RandomForest`] and [`crate::GradientBoosting`].
///
/// Implementors provide row-level growth and scoring; subject-level
/// prediction, training and evaluation come with the trait.
pub trait Ensemble {
    fn meta(&self) -> &ModelMeta;

    fn meta_mut(&mut self) -> &mut ModelMeta;

    /// Fortify existing trees against `rows` and sprout the missing ones.
    fn grow(&mut self, rows: &[Row], rng: &mut dyn RngCore);

    /// Tree sequences: one for a forest, one per target for boosting.
    fn sequences(&self) -> Vec<&[Tree]>;

    /// Class distribution, or a single numeric estimate for regression.
    fn estimate_row(&self, row: &[f64]) -> Vec<f64>;

    fn predict_row(&self, row: &[f64]) -> Option<Prediction>;

    fn tree_count(&self) -> usize {
        self.sequences().iter().map(|s| s.len()).sum()
    }

    /// Raw leaf value of every tree, grouped by sequence.
    fn vote_row(&self, row: &[f64]) -> Vec<Vec<f64>> {
        let nn = self.meta().encoder.num_numerical();
        self.sequences()
            .iter()
            .map(|seq| seq.iter().map(|t| t.predict(row, nn)).collect())
            .collect()
    }

    fn predict(&self, subject: &Subject) -> Option<Prediction> {
        self.predict_row(&self.meta().encoder.encode(subject))
    }

    fn vote(&self, subject: &Subject) -> Vec<Vec<f64>> {
        self.vote_row(&self.meta().encoder.encode(subject))
    }

    fn estimate(&self, subject: &Subject) -> Vec<f64> {
        self.estimate_row(&self.meta().encoder.encode(subject))
    }

    fn predict_batch(&self, subjects: &[Subject]) -> Vec<Option<Prediction>>
    where
        Self: Sync,
    {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            subjects.par_iter().map(|s| self.predict(s)).collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            subjects.iter().map(|s| self.predict(s)).collect()
        }
    }

    fn estimate_batch(&self, subjects: &[Subject]) -> Vec<Vec<f64>>
    where
        Self: Sync,
    {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            subjects.par_iter().map(|s| self.estimate(s)).collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            subjects.iter().map(|s| self.estimate(s)).collect()
        }
    }

    /// Grow over already encoded rows, reseeding from the stored seed.
    fn train_rows(&mut self, rows: &[Row]) {
        let seed = self.meta().seed;
        debug!(seed, rows = rows.len(), trees = self.tree_count(), "training ensemble");
        let mut rng = StdRng::seed_from_u64(seed);
        self.grow(rows, &mut rng);
    }

    /// Encode `subjects` and fortify/grow the ensemble with them.
    fn train(&mut self, subjects: &[Subject]) {
        let rows = self.meta_mut().tabulate(subjects);
        self.train_rows(&rows);
    }

    /// Train on pre-encoded feature rows. For classification, `y` holds class
    /// labels, which join `classes` like subject outcomes do.
    fn fit(&mut self, x: &[Row], y: &[f64]) -> GroveResult<()> {
        let rows = self.meta_mut().rows_from(x, y)?;
        self.train_rows(&rows);
        Ok(())
    }

    fn validate(&self, subjects: &[Subject]) -> Validation {
        let meta = self.meta();
        let scored: Vec<(f64, Option<Prediction>)> = subjects
            .iter()
            .map(|s| (meta.outcome_value(s), s))
            .filter(|(expected, _)| !expected.is_nan())
            .map(|(expected, s)| (expected, self.predict(s)))
            .collect();

        match &meta.classes {
            Some(classes) => {
                let expected: Vec<usize> = scored.iter().map(|(e, _)| *e as usize).collect();
                let predicted: Vec<usize> = scored
                    .iter()
                    .map(|(_, p)| {
                        p.as_ref()
                            .and_then(Prediction::as_class)
                            .and_then(|c| classes.iter().position(|k| k == c))
                            .unwrap_or(usize::MAX)
                    })
                    .collect();
                let f1: Vec<(String, f64)> = classes
                    .iter()
                    .cloned()
                    .zip(f1_per_class(&expected, &predicted, classes.len()))
                    .collect();
                let macro_f1 = f1_macro(&expected, &predicted, classes.len());
                Validation::Classification {
                    count: expected.len(),
                    accuracy: accuracy(&expected, &predicted),
                    f1,
                    macro_f1,
                }
            }
            None => {
                let expected: Vec<f64> = scored.iter().map(|(e, _)| *e).collect();
                let predicted: Vec<f64> = scored
                    .iter()
                    .map(|(_, p)| p.as_ref().and_then(Prediction::as_value).unwrap_or(f64::NAN))
                    .collect();
                Validation::Regression {
                    count: expected.len(),
                    r2: r2_score(&expected, &predicted),
                    mae: mae(&expected, &predicted),
                    rmse: rmse(&expected, &predicted),
                    mse: mse(&expected, &predicted),
                }
            }
        }
    }

    /// One-vs-rest ROC curve per class from the class estimates.
    fn auc(&self, subjects: &[Subject]) -> GroveResult<Vec<RocResult>> {
        let meta = self.meta();
        let classes = meta.classes.as_ref().ok_or(GroveError::NotClassification)?;
        let scored: Vec<(usize, Vec<f64>)> = subjects
            .iter()
            .map(|s| (meta.outcome_value(s), s))
            .filter(|(expected, _)| !expected.is_nan())
            .map(|(expected, s)| (expected as usize, self.estimate(s)))
            .collect();

        Ok(classes
            .iter()
            .enumerate()
            .map(|(c, class)| {
                let labels: Vec<bool> = scored.iter().map(|(e, _)| *e == c).collect();
                let scores: Vec<f64> = scored
                    .iter()
                    .map(|(_, est)| est.get(c).copied().unwrap_or(0.0))
                    .collect();
                RocResult {
                    class: class.clone(),
                    curve: roc_curve(&labels, &scores),
                }
            })
            .collect())
    }

    /// Impurity decrease per feature path, largest first.
    fn importance(&self) -> Vec<(String, f64)> {
        let encoder = &self.meta().encoder;
        let mut scores = vec![0.0; encoder.num_features()];
        for seq in self.sequences() {
            for tree in seq {
                tree.root.accumulate_importance(tree.baseline, &mut scores);
            }
        }
        let mut ranked: Vec<(String, f64)> = encoder
            .feature_names()
            .map(str::to_string)
            .zip(scores)
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec() -> ModelSpec {
        ModelSpec::new("label", Objective::Classification)
            .with_numerical(&["x"])
            .with_categorical(&["tags"])
            .with_seed(7)
    }

    #[test]
    fn test_tabulate_registers_classes_and_skips_missing() {
        let mut meta = ModelMeta::new(spec());
        let rows = meta.tabulate(&[
            json!({"x": 1, "tags": ["b", "a"], "label": "yes"}),
            json!({"x": 2, "label": null}),
            json!({"x": 3, "tags": "c", "label": "no"}),
            json!({"x": 4, "label": "yes"}),
        ]);
        assert_eq!(meta.classes, Some(vec!["yes".to_string(), "no".to_string()]));
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec![1.0, 0.0, 0.0]);
        assert_eq!(rows[1], vec![3.0, 1.0, 1.0]);
        assert_eq!(rows[2], vec![4.0, 2.0, 0.0]);
        assert_eq!(meta.encoder.codebook().category(0, 0.0), Some("a,b"));
    }

    #[test]
    fn test_regression_skips_non_numeric_outcomes() {
        let mut meta = ModelMeta::new(ModelSpec::new("y", Objective::Regression).with_numerical(&["x"]));
        let rows = meta.tabulate(&[json!({"x": 1, "y": 2.5}), json!({"x": 2, "y": "n/a"}), json!({"x": 3})]);
        assert_eq!(rows, vec![vec![1.0, 2.5]]);
        assert!(!meta.is_classification());
    }

    #[test]
    fn test_rows_from_checks_shapes() {
        let mut meta = ModelMeta::new(spec());
        assert_eq!(
            meta.rows_from(&[vec![1.0, 0.0]], &[]),
            Err(GroveError::DimensionMismatch { expected: 1, got: 0 })
        );
        assert_eq!(
            meta.rows_from(&[vec![1.0]], &[0.0]),
            Err(GroveError::DimensionMismatch { expected: 2, got: 1 })
        );
        let rows = meta.rows_from(&[vec![1.0, 0.0], vec![2.0, 0.0]], &[1.0, 0.0]).unwrap();
        assert_eq!(rows, vec![vec![1.0, 0.0, 0.0], vec![2.0, 0.0, 1.0]]);
        assert_eq!(meta.classes, Some(vec!["1".to_string(), "0".to_string()]));
    }

    #[test]
    fn test_rows_from_skips_non_finite_outcomes() {
        let mut meta = ModelMeta::new(spec());
        let x = vec![vec![1.0, 0.0], vec![2.0, 0.0], vec![3.0, 1.0]];
        let rows = meta.rows_from(&x, &[0.0, f64::NAN, 1.0]).unwrap();
        assert_eq!(rows, vec![vec![1.0, 0.0, 0.0], vec![3.0, 1.0, 1.0]]);
        assert_eq!(meta.classes, Some(vec!["0".to_string(), "1".to_string()]));

        // shape errors still win over skipped rows
        assert_eq!(
            meta.rows_from(&[vec![1.0]], &[f64::NAN]),
            Err(GroveError::DimensionMismatch { expected: 2, got: 1 })
        );

        let mut meta = ModelMeta::new(ModelSpec::new("y", Objective::Regression).with_numerical(&["x"]));
        let rows = meta.rows_from(&[vec![1.0], vec![2.0]], &[f64::INFINITY, 4.0]).unwrap();
        assert_eq!(rows, vec![vec![2.0, 4.0]]);
    }

    #[test]
    fn test_fit_ignores_nan_targets() {
        use crate::RandomForest;

        let spec = ModelSpec::new("y", Objective::Regression).with_numerical(&["x"]).with_seed(2);
        let mut model = RandomForest::new(spec);
        let x: Vec<Row> = (0..50).map(|i| vec![i as f64]).collect();
        let mut y: Vec<f64> = (0..50).map(|i| 2.0 * i as f64).collect();
        y[10] = f64::NAN;
        model.fit(&x, &y).unwrap();

        let v = model.predict(&serde_json::json!({"x": 40})).and_then(|p| p.as_value()).unwrap();
        assert!(v.is_finite());
        assert!((v - 80.0).abs() < 20.0, "predicted {v}");
    }

    #[test]
    fn test_out_of_range_params_sanitized() {
        let spec = spec().with_params(Hyperparameters {
            max_tree: 0,
            ..Hyperparameters::default()
        });
        assert_eq!(ModelMeta::new(spec).params.max_tree, Hyperparameters::default().max_tree);
    }

    #[test]
    fn test_argmax_prefers_first() {
        assert_eq!(argmax(&[0.2, 0.5, 0.5]), Some(1));
        assert_eq!(argmax(&[]), None);
    }
}
