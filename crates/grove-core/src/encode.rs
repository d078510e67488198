//! Feature encoding: subject records to fixed-width numeric rows.
//!
//! A row is laid out as `[numerical..., categorical codes..., extra columns...]`.
//! Numerical cells hold the coerced number, categorical cells hold the code of
//! the canonical category string in a per-column [`Codebook`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::subject::{self, Subject};

/// The fixed numeric encoding of one subject.
pub type Row = Vec<f64>;

/// Coerce a field value to a number. Arrays count as their length.
pub fn numeric_value(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::Array(items)) => items.len() as f64,
        Some(Value::Bool(b)) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Some(Value::String(s)) => s.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

/// Coerce a field value to its canonical category string.
///
/// Arrays become their sorted element texts joined by `,`; missing values
/// become the empty string.
pub fn categorical_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => {
            let mut parts: Vec<String> = items.iter().map(|v| categorical_value(Some(v))).collect();
            parts.sort();
            parts.join(",")
        }
        Some(other) => other.to_string(),
    }
}

/// Per-column category dictionaries. Codes are positions and never change
/// once assigned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Codebook {
    columns: Vec<Vec<String>>,
}

impl Codebook {
    pub fn new(width: usize) -> Self {
        Codebook {
            columns: vec![Vec::new(); width],
        }
    }

    /// Code of `category` in `column`, assigning the next code if unseen.
    pub fn code(&mut self, column: usize, category: String) -> f64 {
        if column >= self.columns.len() {
            self.columns.resize(column + 1, Vec::new());
        }
        let entries = &mut self.columns[column];
        match entries.iter().position(|c| *c == category) {
            Some(i) => i as f64,
            None => {
                entries.push(category);
                (entries.len() - 1) as f64
            }
        }
    }

    /// Code of `category` in `column`, or `NaN` when it was never registered.
    pub fn lookup(&self, column: usize, category: &str) -> f64 {
        self.columns
            .get(column)
            .and_then(|entries| entries.iter().position(|c| c == category))
            .map_or(f64::NAN, |i| i as f64)
    }

    pub fn category(&self, column: usize, code: f64) -> Option<&str> {
        if code.is_nan() || code < 0.0 {
            return None;
        }
        self.columns
            .get(column)
            .and_then(|entries| entries.get(code as usize))
            .map(String::as_str)
    }
}

/// Feature paths plus the category codebook learned so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encoder {
    pub numerical: Vec<String>,
    pub categorical: Vec<String>,
    codebook: Codebook,
}

impl Encoder {
    pub fn new(numerical: Vec<String>, categorical: Vec<String>) -> Self {
        let codebook = Codebook::new(categorical.len());
        Encoder {
            numerical,
            categorical,
            codebook,
        }
    }

    pub fn num_numerical(&self) -> usize {
        self.numerical.len()
    }

    pub fn num_features(&self) -> usize {
        self.numerical.len() + self.categorical.len()
    }

    /// Feature paths in row order.
    pub fn feature_names(&self) -> impl Iterator<Item = &str> {
        self.numerical
            .iter()
            .chain(self.categorical.iter())
            .map(String::as_str)
    }

    pub fn codebook(&self) -> &Codebook {
        &self.codebook
    }

    /// Encode without learning new categories; unseen ones become `NaN`.
    pub fn encode(&self, subject: &Subject) -> Row {
        let mut row = Vec::with_capacity(self.num_features() + 1);
        row.extend(
            self.numerical
                .iter()
                .map(|path| numeric_value(subject::get(subject, path))),
        );
        row.extend(self.categorical.iter().enumerate().map(|(column, path)| {
            self.codebook
                .lookup(column, &categorical_value(subject::get(subject, path)))
        }));
        row
    }

    /// Encode and register any category not seen before.
    pub fn register(&mut self, subject: &Subject) -> Row {
        let mut row = Vec::with_capacity(self.num_features() + 1);
        row.extend(
            self.numerical
                .iter()
                .map(|path| numeric_value(subject::get(subject, path))),
        );
        for (column, path) in self.categorical.iter().enumerate() {
            let category = categorical_value(subject::get(subject, path));
            row.push(self.codebook.code(column, category));
        }
        row
    }
}

/// A column appended after the encoded features.
pub type ExtraColumn<'a> = &'a dyn Fn(&Subject) -> f64;

/// Encode every subject, registering categories, and append extra columns.
pub fn tabulate(subjects: &[Subject], encoder: &mut Encoder, extra: &[ExtraColumn<'_>]) -> Vec<Row> {
    subjects
        .iter()
        .map(|subject| {
            let mut row = encoder.register(subject);
            row.extend(extra.iter().map(|column| column(subject)));
            row
        })
        .collect()
}
