use serde::{Deserialize, Serialize};

/// Whether the outcome is a class label or a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Objective {
    Classification,
    Regression,
}

/// Growth limits shared by both ensemble strategies.
///
/// Missing fields deserialize to their defaults; out-of-range values are
/// replaced by [`Hyperparameters::sanitized`], including when a saved model
/// is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawHyperparameters")]
pub struct Hyperparameters {
    /// A node with this many rows or fewer becomes a leaf.
    pub min_size: usize,
    pub max_depth: usize,
    /// Trees per ensemble (Random Forest) or per sequence (Gradient Boosting).
    pub max_tree: usize,
    /// Share of features (Random Forest) or rows (Gradient Boosting) sampled per tree.
    pub sampling_rate: f64,
    pub learning_rate: f64,
    /// Outer feature draws and inner cutoff draws per split search.
    pub max_attempt: usize,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Hyperparameters {
            min_size: 2,
            max_depth: 6,
            max_tree: 20,
            sampling_rate: 0.8,
            learning_rate: 0.3,
            max_attempt: 10,
        }
    }
}

/// Wire form of [`Hyperparameters`], taken as-is before sanitizing.
#[derive(Deserialize)]
#[serde(default)]
struct RawHyperparameters {
    min_size: usize,
    max_depth: usize,
    max_tree: usize,
    sampling_rate: f64,
    learning_rate: f64,
    max_attempt: usize,
}

impl Default for RawHyperparameters {
    fn default() -> Self {
        let d = Hyperparameters::default();
        RawHyperparameters {
            min_size: d.min_size,
            max_depth: d.max_depth,
            max_tree: d.max_tree,
            sampling_rate: d.sampling_rate,
            learning_rate: d.learning_rate,
            max_attempt: d.max_attempt,
        }
    }
}

impl From<RawHyperparameters> for Hyperparameters {
    fn from(raw: RawHyperparameters) -> Self {
        Hyperparameters {
            min_size: raw.min_size,
            max_depth: raw.max_depth,
            max_tree: raw.max_tree,
            sampling_rate: raw.sampling_rate,
            learning_rate: raw.learning_rate,
            max_attempt: raw.max_attempt,
        }
        .sanitized()
    }
}

fn unit_rate(rate: f64, fallback: f64) -> f64 {
    if rate.is_finite() && rate > 0.0 && rate <= 1.0 {
        rate
    } else {
        fallback
    }
}

impl Hyperparameters {
    /// Replace out-of-range values with defaults.
    pub fn sanitized(self) -> Self {
        let d = Hyperparameters::default();
        Hyperparameters {
            min_size: self.min_size,
            max_depth: if self.max_depth == 0 { d.max_depth } else { self.max_depth },
            max_tree: if self.max_tree == 0 { d.max_tree } else { self.max_tree },
            sampling_rate: unit_rate(self.sampling_rate, d.sampling_rate),
            learning_rate: unit_rate(self.learning_rate, d.learning_rate),
            max_attempt: if self.max_attempt == 0 { d.max_attempt } else { self.max_attempt },
        }
    }
}

/// Everything needed to create a model before it sees data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub outcome: String,
    #[serde(default)]
    pub numerical: Vec<String>,
    #[serde(default)]
    pub categorical: Vec<String>,
    pub objective: Objective,
    /// Drawn from entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub params: Hyperparameters,
}

impl ModelSpec {
    pub fn new(outcome: &str, objective: Objective) -> Self {
        ModelSpec {
            outcome: outcome.to_string(),
            numerical: Vec::new(),
            categorical: Vec::new(),
            objective,
            seed: None,
            params: Hyperparameters::default(),
        }
    }

    pub fn with_numerical(mut self, paths: &[&str]) -> Self {
        self.numerical = paths.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn with_categorical(mut self, paths: &[&str]) -> Self {
        self.categorical = paths.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_params(mut self, params: Hyperparameters) -> Self {
        self.params = params;
        self
    }
}
