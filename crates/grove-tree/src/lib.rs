pub mod params;
pub mod impurity;
pub mod node;
pub mod sprout;
pub mod fortify;
pub mod model;
pub mod random_forest;
pub mod gradient_boosting;

pub use params::{Hyperparameters, ModelSpec, Objective};
pub use impurity::{goes_left, gini, mse, partition, summarize, Columns, Partition};
pub use node::{Node, Tree};
pub use sprout::{find_split, sprout, Candidate, Context};
pub use fortify::fortify;
pub use model::{Ensemble, ModelMeta, Prediction, RocResult, Validation};
pub use random_forest::RandomForest;
pub use gradient_boosting::GradientBoosting;
