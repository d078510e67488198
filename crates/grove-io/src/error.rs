use grove_core::GroveError;
use thiserror::Error;

/// Failure while reading or writing Grove data and models.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Model error: {0}")]
    Model(#[from] GroveError),
}

pub type PersistResult<T> = Result<T, PersistError>;
