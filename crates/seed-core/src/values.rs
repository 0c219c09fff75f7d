//! Values and rows produced by a synthesizer and consumed by a target.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single column value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeedValue {
    /// SQL NULL
    Null,
    /// Integer of any width
    Integer(i64),
    /// Floating point
    Float(f64),
    /// Boolean
    Bool(bool),
    /// Timestamp in UTC
    Timestamp(DateTime<Utc>),
    /// Text, also used for enum labels and uuid-like keys
    Text(String),
    /// JSON document
    Json(serde_json::Value),
}

impl SeedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SeedValue::Null)
    }

    /// Canonical text form of a key value, for membership checks.
    ///
    /// Reference samples are fetched as text, so comparing keys through
    /// this form is independent of how the synthesizer typed them.
    pub fn key_text(&self) -> Option<String> {
        match self {
            SeedValue::Null => None,
            SeedValue::Integer(i) => Some(i.to_string()),
            SeedValue::Float(f) => Some(f.to_string()),
            SeedValue::Bool(b) => Some(b.to_string()),
            SeedValue::Timestamp(ts) => Some(ts.to_rfc3339()),
            SeedValue::Text(s) => Some(s.clone()),
            SeedValue::Json(j) => Some(j.to_string()),
        }
    }
}

impl From<i64> for SeedValue {
    fn from(value: i64) -> Self {
        SeedValue::Integer(value)
    }
}

impl From<i32> for SeedValue {
    fn from(value: i32) -> Self {
        SeedValue::Integer(value as i64)
    }
}

impl From<bool> for SeedValue {
    fn from(value: bool) -> Self {
        SeedValue::Bool(value)
    }
}

impl From<&str> for SeedValue {
    fn from(value: &str) -> Self {
        SeedValue::Text(value.to_string())
    }
}

impl From<String> for SeedValue {
    fn from(value: String) -> Self {
        SeedValue::Text(value)
    }
}

/// One synthesized row: column name to value.
///
/// Columns missing from a row are written as NULL when another row in the
/// same batch sets them, and left out of the INSERT entirely otherwise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeedRow {
    /// Row index within the table pass
    pub index: u64,
    values: BTreeMap<String, SeedValue>,
}

impl SeedRow {
    pub fn new(index: u64) -> Self {
        Self {
            index,
            values: BTreeMap::new(),
        }
    }

    /// Builder-style setter.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<SeedValue>) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<SeedValue>) {
        self.values.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&SeedValue> {
        self.values.get(column)
    }

    pub fn remove(&mut self, column: &str) -> Option<SeedValue> {
        self.values.remove(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.values.contains_key(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
