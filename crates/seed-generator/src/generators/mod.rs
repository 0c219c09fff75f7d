//! Individual value generators.
//!
//! [`generate_configured`] evaluates an explicit [`GeneratorConfig`] from the
//! seed configuration; [`generate_default`] derives a value from nothing but
//! the live column description.

pub mod numeric;
pub mod pattern;
pub mod static_value;
pub mod timestamp;
pub mod uuid;

use rand::Rng;
use seed_core::{ColumnDescriptor, ColumnType, GeneratorConfig, SeedValue};

/// Generate a value based on a configured generator, coerced to the
/// column's category.
pub fn generate_configured<R: Rng>(
    config: &GeneratorConfig,
    rng: &mut R,
    index: u64,
    column: &ColumnDescriptor,
) -> SeedValue {
    let raw = match config {
        GeneratorConfig::UuidV4 => uuid::generate_uuid_v4(rng),

        GeneratorConfig::Sequential { start } => {
            SeedValue::Integer(start.saturating_add(i64::try_from(index).unwrap_or(i64::MAX)))
        }

        GeneratorConfig::Pattern { pattern } => pattern::generate_pattern(pattern, rng, index),

        GeneratorConfig::IntRange { min, max } => numeric::generate_int_range(rng, *min, *max),

        GeneratorConfig::FloatRange { min, max } => numeric::generate_float_range(rng, *min, *max),

        GeneratorConfig::TimestampRange { start, end } => {
            timestamp::generate_timestamp_range(rng, start, end)
        }

        GeneratorConfig::WeightedBool { true_weight } => {
            SeedValue::Bool(rng.gen_bool(true_weight.clamp(0.0, 1.0)))
        }

        GeneratorConfig::OneOf { values } => {
            if values.is_empty() {
                SeedValue::Null
            } else {
                let idx = rng.gen_range(0..values.len());
                static_value::yaml_to_seed_value(&values[idx])
            }
        }

        GeneratorConfig::Static { value } => static_value::yaml_to_seed_value(value),

        GeneratorConfig::Null => SeedValue::Null,
    };
    coerce(raw, &column.column_type)
}

/// Generate a value from the column description alone.
///
/// Non-auto primary keys get values derived from the row index so they are
/// unique within the pass (the table is empty when a pass writes to it).
pub fn generate_default<R: Rng>(rng: &mut R, index: u64, column: &ColumnDescriptor) -> SeedValue {
    let native = column.native_type.as_str();
    match &column.column_type {
        ColumnType::Integer if column.is_primary_key => SeedValue::Integer(index as i64 + 1),
        ColumnType::Integer => numeric::generate_int_range(rng, 1, 1000),

        ColumnType::Float => numeric::generate_float_range(rng, 0.0, 999.0),

        ColumnType::Bool => SeedValue::Bool(rng.gen_bool(0.5)),

        ColumnType::Timestamp => timestamp::generate_timestamp_range(
            rng,
            timestamp::DEFAULT_START,
            timestamp::DEFAULT_END,
        ),

        ColumnType::Json => SeedValue::Json(serde_json::json!({
            "index": index,
            "score": rng.gen_range(0..100),
        })),

        ColumnType::Enum { labels } => {
            if labels.is_empty() {
                SeedValue::Null
            } else {
                SeedValue::Text(labels[rng.gen_range(0..labels.len())].clone())
            }
        }

        ColumnType::Text { max_length } => {
            let text = match native {
                "uuid" => uuid::random_uuid(rng).to_string(),
                "inet" | "cidr" => format!(
                    "10.{}.{}.{}",
                    (index >> 16) & 0xff,
                    (index >> 8) & 0xff,
                    index & 0xff
                ),
                "interval" => format!("{} minutes", rng.gen_range(1..600)),
                "money" => format!("{}.{:02}", rng.gen_range(0..1000), rng.gen_range(0..100)),
                array if array.starts_with('_') => "{}".to_string(),
                _ if column.is_primary_key => {
                    if max_length.map_or(true, |len| len >= 36) {
                        uuid::random_uuid(rng).to_string()
                    } else {
                        (index + 1).to_string()
                    }
                }
                _ => format!("{}_{}", column.name, index),
            };
            SeedValue::Text(fit_length(text, *max_length))
        }
    }
}

/// Keep the tail of `text` when it exceeds `max_length` characters; the
/// tail carries the row index and so keeps values distinct.
fn fit_length(text: String, max_length: Option<u32>) -> String {
    match max_length {
        Some(max) if text.chars().count() > max as usize => {
            let skip = text.chars().count() - max as usize;
            text.chars().skip(skip).collect()
        }
        _ => text,
    }
}

/// Convert a generated value to the shape expected by a column category.
pub fn coerce(value: SeedValue, column_type: &ColumnType) -> SeedValue {
    match (column_type, value) {
        (_, SeedValue::Null) => SeedValue::Null,
        (ColumnType::Float, SeedValue::Integer(i)) => SeedValue::Float(i as f64),
        (ColumnType::Integer, SeedValue::Float(f)) => SeedValue::Integer(f.round() as i64),
        (ColumnType::Integer, SeedValue::Bool(b)) => SeedValue::Integer(b as i64),
        (ColumnType::Text { max_length }, value) => match value {
            SeedValue::Text(s) => SeedValue::Text(fit_length(s, *max_length)),
            other => SeedValue::Text(fit_length(other.key_text().unwrap_or_default(), *max_length)),
        },
        (ColumnType::Enum { .. }, value @ SeedValue::Text(_)) => value,
        (ColumnType::Enum { .. }, other) => SeedValue::Text(other.key_text().unwrap_or_default()),
        (ColumnType::Json, SeedValue::Json(j)) => SeedValue::Json(j),
        (ColumnType::Json, SeedValue::Text(s)) => {
            SeedValue::Json(serde_json::from_str(&s).unwrap_or(serde_json::Value::String(s)))
        }
        (ColumnType::Json, SeedValue::Integer(i)) => SeedValue::Json(i.into()),
        (ColumnType::Json, SeedValue::Bool(b)) => SeedValue::Json(b.into()),
        (_, value) => value,
    }
}
