//! # Grove
//!
//! Randomized decision-tree ensembles over structured records, with
//! incremental retraining.
//!
//! ## Modules
//!
//! - **core** - Subjects, dotted-path access, feature encoding, errors
//! - **tree** - Tree induction and fortification, Random Forest, Gradient Boosting
//! - **metrics** - Accuracy, F1, R², MAE, RMSE, ROC curves
//! - **io** - CSV subject loading, JSON model and spec persistence
//!
//! ## Example
//!
//! ```no_run
//! use grove::prelude::*;
//! use serde_json::json;
//!
//! let subjects = vec![
//!     json!({"x": 1, "label": "A"}),
//!     json!({"x": 9, "label": "B"}),
//! ];
//! let spec = ModelSpec::new("label", Objective::Classification).with_numerical(&["x"]);
//! let mut model = RandomForest::create(spec, &subjects);
//! model.train(&[json!({"x": 2, "label": "A"})]);
//! println!("{:?}", model.predict(&json!({"x": 3})));
//! ```

/// Subjects, encoding and errors.
pub use grove_core as core;

/// Tree ensembles.
pub use grove_tree as tree;

/// Evaluation metrics.
pub use grove_metrics as metrics;

/// Data and model persistence.
pub use grove_io as io;

/// Convenience re-exports of the most commonly used types.
pub mod prelude {
    pub use grove_core::{Encoder, GroveError, GroveResult, Row, Subject};
    pub use grove_io::{load_model, load_spec, read_subjects, save_model, PersistError};
    pub use grove_tree::{
        Ensemble, GradientBoosting, Hyperparameters, ModelMeta, ModelSpec, Objective, Prediction,
        RandomForest, RocResult, Validation,
    };
}
