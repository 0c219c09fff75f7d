//! Default record synthesizer.

use crate::generators::{generate_configured, generate_default};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use seed_core::{
    ColumnDescriptor, RecordSynthesizer, ReferencePool, SeedConfig, SeedError, SeedRow, SeedValue,
    TableDescriptor,
};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Data generator that produces deterministic rows for live tables.
///
/// Every table pass uses its own RNG derived from the configured seed and
/// the table name, so the rows produced for a table do not depend on which
/// other tables were seeded before it.
pub struct DataGenerator {
    /// Seed configuration (seed and column overrides)
    config: SeedConfig,
}

impl DataGenerator {
    pub fn new(config: SeedConfig) -> Self {
        Self { config }
    }

    /// Generator with default settings and the given seed.
    pub fn with_seed(seed: u64) -> Self {
        let mut config = SeedConfig::default();
        config.seed = seed;
        Self::new(config)
    }

    pub fn config(&self) -> &SeedConfig {
        &self.config
    }

    /// RNG for one table pass.
    fn rng_for(&self, table: &str) -> StdRng {
        StdRng::seed_from_u64(self.config.seed ^ fnv1a(table))
    }

    /// Generate one row of `table`.
    fn generate_row(
        &self,
        rng: &mut StdRng,
        table: &TableDescriptor,
        references: &ReferencePool,
        walk: &KeyWalk,
        index: u64,
    ) -> Result<SeedRow, SeedError> {
        let mut row = SeedRow::new(index);

        for column in table.writable_columns() {
            if column.is_foreign_key() {
                let value = reference_value(rng, table, column, references, walk, index)?;
                if let Some(value) = value {
                    row.set(column.name.clone(), value);
                }
                continue;
            }

            let value = match self.config.column_generator(&table.name, &column.name) {
                Some(generator) => generate_configured(generator, rng, index, column),
                None => generate_default(rng, index, column),
            };
            row.set(column.name.clone(), value);
        }

        Ok(row)
    }
}

/// Row index to sample position mapping for foreign key columns whose
/// values must not repeat.
///
/// A UNIQUE column, or the sole column of a primary key, walks its sample
/// in order. A composite primary key made only of foreign keys enumerates
/// distinct key tuples, the first column varying fastest. `capacity` is the
/// number of rows that can be produced without repeating.
#[derive(Debug, Default)]
struct KeyWalk {
    strides: HashMap<String, u64>,
    capacity: Option<u64>,
}

impl KeyWalk {
    fn plan(table: &TableDescriptor, references: &ReferencePool) -> Self {
        let mut walk = Self::default();
        let sample_len = |column: &ColumnDescriptor| {
            references.values(&column.name).map(|v| v.len() as u64)
        };

        for column in table.writable_columns() {
            if !column.is_foreign_key() || !table.requires_distinct(column) {
                continue;
            }
            if let Some(len) = sample_len(column) {
                walk.strides.insert(column.name.clone(), 1);
                walk.limit(len);
            }
        }

        let primary: Vec<&ColumnDescriptor> = table.primary_key_columns().collect();
        let composite = primary.len() > 1
            && primary.iter().all(|c| c.is_foreign_key() && c.is_insertable())
            && !primary.iter().any(|c| walk.strides.contains_key(&c.name));
        if composite {
            let lens: Option<Vec<u64>> = primary.iter().map(|&c| sample_len(c)).collect();
            if let Some(lens) = lens {
                let mut stride = 1u64;
                for (column, len) in primary.iter().zip(lens) {
                    walk.strides.insert(column.name.clone(), stride);
                    stride = stride.saturating_mul(len);
                }
                walk.limit(stride);
            }
        }

        walk
    }

    fn limit(&mut self, rows: u64) {
        self.capacity = Some(self.capacity.map_or(rows, |c| c.min(rows)));
    }

    fn position(&self, column: &str, index: u64, len: usize) -> Option<usize> {
        self.strides
            .get(column)
            .map(|stride| ((index / stride) % len as u64) as usize)
    }
}

/// Pick a value for a foreign key column from the reference pool.
///
/// Returns `None` when the column must be left out of the row.
fn reference_value(
    rng: &mut StdRng,
    table: &TableDescriptor,
    column: &ColumnDescriptor,
    references: &ReferencePool,
    walk: &KeyWalk,
    index: u64,
) -> Result<Option<SeedValue>, SeedError> {
    if references.is_unresolved(&column.name) {
        return Ok(None);
    }

    match references.values(&column.name) {
        Some(values) => {
            let position = walk
                .position(&column.name, index, values.len())
                .unwrap_or_else(|| rng.gen_range(0..values.len()));
            Ok(Some(values[position].clone()))
        }
        None if column.nullable => Ok(Some(SeedValue::Null)),
        None => Err(SeedError::Synthesis {
            table: table.name.clone(),
            message: format!("no reference values supplied for column '{}'", column.name),
        }),
    }
}

impl RecordSynthesizer for DataGenerator {
    fn synthesize(
        &mut self,
        table: &TableDescriptor,
        references: &ReferencePool,
        count: u64,
    ) -> Result<Vec<SeedRow>, SeedError> {
        let walk = KeyWalk::plan(table, references);
        let count = match walk.capacity {
            Some(capacity) if capacity < count => {
                warn!(
                    table = %table.name,
                    requested = count,
                    capacity,
                    "Not enough distinct reference keys, producing fewer rows"
                );
                capacity
            }
            _ => count,
        };

        let mut rng = self.rng_for(&table.name);
        let rows = (0..count)
            .map(|index| self.generate_row(&mut rng, table, references, &walk, index))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(table = %table.name, rows = rows.len(), "Synthesized rows");
        Ok(rows)
    }
}

/// 64-bit FNV-1a hash, stable across platforms and releases.
fn fnv1a(input: &str) -> u64 {
    const OFFSET: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    input.bytes().fold(OFFSET, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(PRIME)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use seed_core::{ColumnType, GeneratorConfig, TableConfig};

    fn students() -> TableDescriptor {
        TableDescriptor::new(
            "students",
            vec![
                ColumnDescriptor::serial_key("id"),
                ColumnDescriptor::new(
                    "email",
                    ColumnType::Text {
                        max_length: Some(120),
                    },
                    "varchar",
                ),
                ColumnDescriptor::new("user_id", ColumnType::Integer, "int4")
                    .references("users", "id"),
                ColumnDescriptor::new("organization_id", ColumnType::Integer, "int4")
                    .nullable()
                    .references("organizations", "id"),
                ColumnDescriptor::new("search", ColumnType::text(), "tsvector").generated(),
            ],
        )
    }

    fn pool() -> ReferencePool {
        let mut pool = ReferencePool::new();
        pool.insert("user_id", vec![SeedValue::Integer(3), SeedValue::Integer(8)]);
        pool.insert("organization_id", vec![SeedValue::Integer(1)]);
        pool
    }

    #[test]
    fn test_skips_auto_and_generated_columns() {
        let mut generator = DataGenerator::with_seed(42);
        let rows = generator.synthesize(&students(), &pool(), 5).unwrap();

        assert_eq!(rows.len(), 5);
        for row in &rows {
            assert!(!row.contains("id"));
            assert!(!row.contains("search"));
            assert!(row.contains("email"));
        }
    }

    #[test]
    fn test_foreign_keys_come_from_pool() {
        let mut generator = DataGenerator::with_seed(42);
        let references = pool();
        let rows = generator.synthesize(&students(), &references, 50).unwrap();

        for row in &rows {
            let user_id = row.get("user_id").unwrap();
            assert!(references.contains_value("user_id", user_id));
            assert_eq!(row.get("organization_id"), Some(&SeedValue::Integer(1)));
        }
    }

    #[test]
    fn test_unresolved_column_is_left_out() {
        let mut references = pool();
        references.insert("organization_id", vec![]);

        let mut generator = DataGenerator::with_seed(42);
        let rows = generator.synthesize(&students(), &references, 3).unwrap();
        assert!(rows.iter().all(|row| !row.contains("organization_id")));
    }

    #[test]
    fn test_missing_required_reference_is_an_error() {
        let mut generator = DataGenerator::with_seed(42);
        let err = generator
            .synthesize(&students(), &ReferencePool::new(), 1)
            .unwrap_err();
        assert_eq!(err.kind(), "synthesis");
    }

    #[test]
    fn test_same_seed_same_rows() {
        let table = students();
        let references = pool();
        let a = DataGenerator::with_seed(7)
            .synthesize(&table, &references, 10)
            .unwrap();
        let b = DataGenerator::with_seed(7)
            .synthesize(&table, &references, 10)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_column_override() {
        let config = SeedConfig::default().with_table(TableConfig {
            name: "students".into(),
            row_count: None,
            columns: vec![seed_core::ColumnConfig {
                name: "email".into(),
                generator: GeneratorConfig::Pattern {
                    pattern: "student_{index}@example.com".into(),
                },
            }],
        });
        let mut generator = DataGenerator::new(config);
        let rows = generator.synthesize(&students(), &pool(), 2).unwrap();
        assert_eq!(
            rows[1].get("email"),
            Some(&SeedValue::Text("student_1@example.com".into()))
        );
    }

    fn integers(values: impl IntoIterator<Item = i64>) -> Vec<SeedValue> {
        values.into_iter().map(SeedValue::Integer).collect()
    }

    fn column_keys(rows: &[SeedRow], column: &str) -> Vec<SeedValue> {
        rows.iter().map(|row| row.get(column).cloned().unwrap()).collect()
    }

    #[test]
    fn test_key_reference_capped_at_sample() {
        // profiles(user_id PRIMARY KEY REFERENCES users)
        let profiles = TableDescriptor::new(
            "profiles",
            vec![ColumnDescriptor::new("user_id", ColumnType::Integer, "int4")
                .primary_key()
                .references("users", "id")],
        );
        let mut references = ReferencePool::new();
        references.insert("user_id", integers([1, 2, 3]));

        let rows = DataGenerator::with_seed(42)
            .synthesize(&profiles, &references, 5)
            .unwrap();
        assert_eq!(column_keys(&rows, "user_id"), integers([1, 2, 3]));
    }

    #[test]
    fn test_unique_reference_never_repeats() {
        let passports = TableDescriptor::new(
            "passports",
            vec![
                ColumnDescriptor::serial_key("id"),
                ColumnDescriptor::new("user_id", ColumnType::Integer, "int4")
                    .unique()
                    .references("users", "id"),
                ColumnDescriptor::new("country_id", ColumnType::Integer, "int4")
                    .references("countries", "id"),
            ],
        );
        let mut references = ReferencePool::new();
        references.insert("user_id", integers(1..=10));
        references.insert("country_id", integers([7]));

        let rows = DataGenerator::with_seed(42)
            .synthesize(&passports, &references, 4)
            .unwrap();
        assert_eq!(column_keys(&rows, "user_id"), integers(1..=4));
        assert_eq!(column_keys(&rows, "country_id"), integers([7; 4]));
    }

    #[test]
    fn test_composite_reference_key_enumerates_pairs() {
        // memberships(user_id, team_id) PRIMARY KEY, both foreign keys
        let memberships = TableDescriptor::new(
            "memberships",
            vec![
                ColumnDescriptor::new("user_id", ColumnType::Integer, "int4")
                    .primary_key()
                    .references("users", "id"),
                ColumnDescriptor::new("team_id", ColumnType::Integer, "int4")
                    .primary_key()
                    .references("teams", "id"),
            ],
        );
        let mut references = ReferencePool::new();
        references.insert("user_id", integers([1, 2, 3]));
        references.insert("team_id", integers([10, 20]));

        let rows = DataGenerator::with_seed(42)
            .synthesize(&memberships, &references, 50)
            .unwrap();
        assert_eq!(rows.len(), 6);
        let pairs: std::collections::HashSet<_> = rows
            .iter()
            .map(|row| {
                (
                    row.get("user_id").and_then(SeedValue::key_text),
                    row.get("team_id").and_then(SeedValue::key_text),
                )
            })
            .collect();
        assert_eq!(pairs.len(), 6);
    }

    #[test]
    fn test_fnv1a_known_value() {
        assert_eq!(fnv1a(""), 0xcbf29ce484222325);
        assert_eq!(fnv1a("a"), 0xaf63dc4c8601ec8c);
    }
}
