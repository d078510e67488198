use thiserror::Error;

/// Error type for the fallible entry points of Grove.
///
/// Tree induction and fortification never fail; these variants cover
/// caller-supplied paths, shapes and model kinds.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GroveError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Operation requires a classification model")]
    NotClassification,
}

pub type GroveResult<T> = Result<T, GroveError>;
