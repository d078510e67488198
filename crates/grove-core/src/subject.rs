//! Dotted-path access into nested subject records.
//!
//! A path such as `"vitals.pressure.0"` walks object keys by name and array
//! elements by decimal index. The empty path addresses the record itself.

use serde_json::{Map, Value};

use crate::error::{GroveError, GroveResult};

/// One input record.
pub type Subject = Value;

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('.').filter(|s| !s.is_empty())
}

/// Resolve `path` inside `subject`. Returns `None` for any missing segment.
pub fn get<'a>(subject: &'a Value, path: &str) -> Option<&'a Value> {
    segments(path).try_fold(subject, |node, key| match node {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Write `value` at `path`, creating intermediate objects as needed.
///
/// Scalars found on the way are replaced by objects. Array segments must be
/// in-range indices.
pub fn set(subject: &mut Value, path: &str, value: Value) -> GroveResult<()> {
    let keys: Vec<&str> = segments(path).collect();
    let Some((last, parents)) = keys.split_last() else {
        *subject = value;
        return Ok(());
    };

    let mut node = subject;
    for key in parents {
        node = child_mut(node, key, path)?;
    }

    match node {
        Value::Array(items) => {
            let slot = key_index(items.len(), last, path)?;
            items[slot] = value;
        }
        other => {
            if !other.is_object() {
                *other = Value::Object(Map::new());
            }
            if let Value::Object(map) = other {
                map.insert((*last).to_string(), value);
            }
        }
    }
    Ok(())
}

fn child_mut<'a>(node: &'a mut Value, key: &str, path: &str) -> GroveResult<&'a mut Value> {
    if !node.is_object() && !node.is_array() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Array(items) => {
            let slot = key_index(items.len(), key, path)?;
            Ok(&mut items[slot])
        }
        Value::Object(map) => Ok(map
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()))),
        _ => Err(GroveError::InvalidPath(path.to_string())),
    }
}

fn key_index(len: usize, key: &str, path: &str) -> GroveResult<usize> {
    match key.parse::<usize>() {
        Ok(i) if i < len => Ok(i),
        _ => Err(GroveError::InvalidPath(path.to_string())),
    }
}
