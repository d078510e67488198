use std::io::Read;
use std::path::Path;

use grove_core::subject::{self, Subject};
use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::error::PersistResult;

fn cell_value(cell: &str) -> Value {
    match cell.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => Number::from_f64(n).map_or_else(|| Value::String(cell.to_string()), Value::Number),
        _ => Value::String(cell.to_string()),
    }
}

/// Read subjects from CSV. Headers are dotted paths, so a column named
/// `vitals.pulse` lands at `{"vitals": {"pulse": ...}}`. Numeric cells
/// become numbers and empty cells are left out.
pub fn read_subjects_from<R: Read>(reader: R) -> PersistResult<Vec<Subject>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();

    let mut subjects = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let mut subject = Value::Object(Map::new());
        for (path, cell) in headers.iter().zip(record.iter()) {
            if cell.trim().is_empty() {
                continue;
            }
            subject::set(&mut subject, path, cell_value(cell))?;
        }
        subjects.push(subject);
    }
    Ok(subjects)
}

/// Read subjects from a CSV file.
pub fn read_subjects(path: impl AsRef<Path>) -> PersistResult<Vec<Subject>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let subjects = read_subjects_from(file)?;
    debug!(path = %path.display(), subjects = subjects.len(), "read subjects");
    Ok(subjects)
}
