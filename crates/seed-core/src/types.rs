//! Column type categories.
//!
//! Every live column is classified into one of a small set of categories.
//! The category decides how a value is synthesized and which Rust type is
//! bound when the value is written. The database's own type name is kept
//! alongside on the [`ColumnDescriptor`](crate::ColumnDescriptor) so the
//! writer can cast back to it.

use serde::{Deserialize, Serialize};

/// Declared type category of a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColumnType {
    /// Any integer width (smallint, integer, bigint).
    Integer,

    /// Floating point and arbitrary precision numerics.
    Float,

    /// Boolean.
    Bool,

    /// Character data, optionally bounded.
    Text {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_length: Option<u32>,
    },

    /// Dates, times and timestamps (with or without time zone).
    Timestamp,

    /// `json` / `jsonb`.
    Json,

    /// Enumerated type with its labels in declaration order.
    Enum { labels: Vec<String> },
}

impl ColumnType {
    /// Unbounded text.
    pub fn text() -> Self {
        ColumnType::Text { max_length: None }
    }

    /// Rough number of bytes a value of this type occupies on the wire.
    ///
    /// Used to size insert batches; precision is not important.
    pub fn estimated_width(&self) -> usize {
        match self {
            ColumnType::Integer | ColumnType::Float | ColumnType::Timestamp => 8,
            ColumnType::Bool => 1,
            ColumnType::Text { max_length } => {
                max_length.map(|len| (len as usize).min(256)).unwrap_or(32)
            }
            ColumnType::Json => 128,
            ColumnType::Enum { labels } => labels.iter().map(String::len).max().unwrap_or(8),
        }
    }

    /// Category name as shown in logs and summaries.
    pub fn category(&self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Bool => "bool",
            ColumnType::Text { .. } => "text",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Json => "json",
            ColumnType::Enum { .. } => "enum",
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnType::Text {
                max_length: Some(len),
            } => write!(f, "text({len})"),
            other => write!(f, "{}", other.category()),
        }
    }
}
