use std::fs;
use std::path::Path;

use grove_tree::ModelSpec;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::PersistResult;

/// Save a model (or any part of one) as pretty JSON.
pub fn save_model<M: Serialize>(model: &M, path: impl AsRef<Path>) -> PersistResult<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(model)?;
    fs::write(path, json)?;
    debug!(path = %path.display(), "saved model");
    Ok(())
}

/// Load a model written by [`save_model`].
pub fn load_model<M: DeserializeOwned>(path: impl AsRef<Path>) -> PersistResult<M> {
    let path = path.as_ref();
    let json = fs::read_to_string(path)?;
    let model = serde_json::from_str(&json)?;
    debug!(path = %path.display(), "loaded model");
    Ok(model)
}

/// Load a [`ModelSpec`] from a JSON file. Missing hyperparameters take
/// their defaults.
pub fn load_spec(path: impl AsRef<Path>) -> PersistResult<ModelSpec> {
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}
