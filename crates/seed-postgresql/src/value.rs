//! Binding [`SeedValue`]s as PostgreSQL parameters.
//!
//! Every column category travels over the wire as one fixed Rust type and is
//! then cast to the column's own type inside the statement, e.g.
//! `$3::int8::int2` or `$4::text::"mood"`. That keeps binding independent of
//! the many native types a category covers.

use crate::error::PostgreSQLSeedError;
use chrono::{DateTime, NaiveDate, Utc};
use seed_core::{ColumnDescriptor, ColumnType, SeedValue};
use tokio_postgres::types::ToSql;

/// Boxed parameter ready for `Client::execute`.
pub type BoxedParam = Box<dyn ToSql + Sync + Send>;

/// Wire type a column category is bound as.
pub fn wire_type(column_type: &ColumnType) -> &'static str {
    match column_type {
        ColumnType::Integer => "int8",
        ColumnType::Float => "float8",
        ColumnType::Bool => "bool",
        ColumnType::Text { .. } | ColumnType::Enum { .. } => "text",
        ColumnType::Timestamp => "timestamptz",
        ColumnType::Json => "jsonb",
    }
}

/// Placeholder for parameter `index` of `column`, cast to its native type.
pub fn placeholder(index: usize, column: &ColumnDescriptor) -> String {
    let native = match &column.native_schema {
        Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(&column.native_type)),
        None => quote_ident(&column.native_type),
    };
    format!("${index}::{}::{native}", wire_type(&column.column_type))
}

/// Quote an identifier, doubling embedded quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Convert `value` to the wire type of `column`.
///
/// Conversions are lenient where they are lossless or obvious (an integer
/// into a float column, RFC 3339 text into a timestamp, ...). Anything else
/// is a [`PostgreSQLSeedError::Bind`].
pub fn bind_value(
    column: &ColumnDescriptor,
    value: &SeedValue,
) -> Result<BoxedParam, PostgreSQLSeedError> {
    let mismatch = |expected: &str| PostgreSQLSeedError::Bind {
        column: column.name.clone(),
        message: format!("expected {expected}, got {value:?}"),
    };

    let param: BoxedParam = match &column.column_type {
        ColumnType::Integer => Box::new(match value {
            SeedValue::Null => None,
            SeedValue::Integer(i) => Some(*i),
            SeedValue::Float(f) => Some(f.round() as i64),
            SeedValue::Bool(b) => Some(*b as i64),
            SeedValue::Text(s) => Some(s.trim().parse::<i64>().map_err(|_| mismatch("integer"))?),
            _ => return Err(mismatch("integer")),
        }),

        ColumnType::Float => Box::new(match value {
            SeedValue::Null => None,
            SeedValue::Float(f) => Some(*f),
            SeedValue::Integer(i) => Some(*i as f64),
            SeedValue::Text(s) => Some(s.trim().parse::<f64>().map_err(|_| mismatch("float"))?),
            _ => return Err(mismatch("float")),
        }),

        ColumnType::Bool => Box::new(match value {
            SeedValue::Null => None,
            SeedValue::Bool(b) => Some(*b),
            SeedValue::Integer(i) => Some(*i != 0),
            SeedValue::Text(s) => match s.to_lowercase().as_str() {
                "true" | "t" | "yes" | "1" => Some(true),
                "false" | "f" | "no" | "0" => Some(false),
                _ => return Err(mismatch("boolean")),
            },
            _ => return Err(mismatch("boolean")),
        }),

        ColumnType::Text { .. } | ColumnType::Enum { .. } => Box::new(value.key_text()),

        ColumnType::Timestamp => Box::new(match value {
            SeedValue::Null => None,
            SeedValue::Timestamp(ts) => Some(*ts),
            SeedValue::Integer(secs) => {
                Some(DateTime::from_timestamp(*secs, 0).ok_or_else(|| mismatch("timestamp"))?)
            }
            SeedValue::Text(s) => Some(parse_timestamp(s).ok_or_else(|| mismatch("timestamp"))?),
            _ => return Err(mismatch("timestamp")),
        }),

        ColumnType::Json => Box::new(match value {
            SeedValue::Null => None,
            SeedValue::Json(j) => Some(j.clone()),
            SeedValue::Text(s) => Some(
                serde_json::from_str(s).unwrap_or_else(|_| serde_json::Value::String(s.clone())),
            ),
            other => Some(serde_json::to_value(other).map_err(|_| mismatch("json"))?),
        }),
    };
    Ok(param)
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
}
