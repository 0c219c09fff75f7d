//! In-memory seed target for tests.
//!
//! [`MemoryTarget`] behaves like a tiny relational database: it enforces
//! NOT NULL, primary key and UNIQUE constraints and foreign key existence,
//! assigns serial keys, and applies each `insert_rows` call atomically.
//! Failures can be injected per table. Tables of other schemas are
//! registered under their qualified name, e.g. `auth.users`.

use async_trait::async_trait;
use seed_core::{
    ColumnDescriptor, ColumnType, ForeignKeyEdge, ForeignKeyRef, SeedError, SeedRow, SeedTarget,
    SeedValue, TableDescriptor,
};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone)]
struct MemoryTable {
    descriptor: TableDescriptor,
    rows: Vec<SeedRow>,
    next_id: i64,
    batches: usize,
}

#[derive(Debug, Default)]
struct MemoryState {
    tables: BTreeMap<String, MemoryTable>,
    failures: HashMap<String, SeedError>,
    sample_failures: HashMap<String, SeedError>,
    inserts: Vec<String>,
}

/// A [`SeedTarget`] backed by process memory.
#[derive(Debug, Default)]
pub struct MemoryTarget {
    state: Mutex<MemoryState>,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`MemoryTarget::add_table`].
    pub fn with_table(self, descriptor: TableDescriptor) -> Self {
        self.add_table(descriptor);
        self
    }

    /// Create (or replace) an empty table.
    pub fn add_table(&self, descriptor: TableDescriptor) {
        self.lock().tables.insert(
            descriptor.name.clone(),
            MemoryTable {
                descriptor,
                rows: Vec::new(),
                next_id: 1,
                batches: 0,
            },
        );
    }

    /// `users`, `organizations` (owned by a user) and `students` (belonging
    /// to a user and an organization), all empty.
    pub fn school() -> Self {
        ["users", "organizations", "students"]
            .into_iter()
            .fold(Self::new(), |target, name| target.with_table(Self::school_table(name)))
    }

    /// Descriptor of one table of [`MemoryTarget::school`].
    pub fn school_table(name: &str) -> TableDescriptor {
        let columns = match name {
            "users" => vec![
                ColumnDescriptor::serial_key("id"),
                ColumnDescriptor::new(
                    "email",
                    ColumnType::Text {
                        max_length: Some(120),
                    },
                    "varchar",
                ),
                ColumnDescriptor::new("display_name", ColumnType::text(), "text").nullable(),
                ColumnDescriptor::new("created_at", ColumnType::Timestamp, "timestamptz")
                    .with_default(),
            ],
            "organizations" => vec![
                ColumnDescriptor::serial_key("id"),
                ColumnDescriptor::new(
                    "name",
                    ColumnType::Text {
                        max_length: Some(80),
                    },
                    "varchar",
                ),
                ColumnDescriptor::new("owner_id", ColumnType::Integer, "int4")
                    .references("users", "id"),
            ],
            "students" => vec![
                ColumnDescriptor::serial_key("id"),
                ColumnDescriptor::new("user_id", ColumnType::Integer, "int4")
                    .references("users", "id"),
                ColumnDescriptor::new("organization_id", ColumnType::Integer, "int4")
                    .references("organizations", "id"),
                ColumnDescriptor::new("grade", ColumnType::Integer, "int2").nullable(),
                ColumnDescriptor::new("enrolled_at", ColumnType::Timestamp, "date"),
            ],
            _ => Vec::new(),
        };
        TableDescriptor::new(name, columns)
    }

    /// Make every later `insert_rows` on `table` fail with `error`.
    pub fn fail_inserts(&self, table: &str, error: SeedError) {
        self.lock().failures.insert(table.to_string(), error);
    }

    /// Make every later `sample_keys` on `table` fail with `error`.
    pub fn fail_samples(&self, table: &str, error: SeedError) {
        self.lock().sample_failures.insert(table.to_string(), error);
    }

    /// Store rows directly, bypassing constraint checks.
    pub fn put_rows(&self, table: &str, rows: impl IntoIterator<Item = SeedRow>) {
        let mut state = self.lock();
        if let Some(t) = state.tables.get_mut(table) {
            for row in rows {
                if let Some(SeedValue::Integer(id)) = row.get("id") {
                    t.next_id = t.next_id.max(id + 1);
                }
                t.rows.push(row);
            }
        }
    }

    /// Committed rows of `table`.
    pub fn rows(&self, table: &str) -> Vec<SeedRow> {
        self.lock()
            .tables
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    /// Committed values of `table.column`, in insertion order.
    pub fn column_values(&self, table: &str, column: &str) -> Vec<SeedValue> {
        self.rows(table)
            .iter()
            .map(|row| row.get(column).cloned().unwrap_or(SeedValue::Null))
            .collect()
    }

    /// Batches `insert_rows` has committed into `table`.
    pub fn batches(&self, table: &str) -> usize {
        self.lock().tables.get(table).map_or(0, |t| t.batches)
    }

    /// Tables passed to `insert_rows`, in call order (including failed calls).
    pub fn insert_calls(&self) -> Vec<String> {
        self.lock().inserts.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MemoryState {
    fn table(&self, name: &str) -> Result<&MemoryTable, SeedError> {
        self.tables
            .get(name)
            .ok_or_else(|| SeedError::SchemaNotFound(name.to_string()))
    }

    /// Whether the referenced column holds `value`, looking at committed
    /// rows and at rows staged earlier in the same call.
    fn key_exists(
        &self,
        staged: &[SeedRow],
        own_table: &str,
        reference: &ForeignKeyRef,
        value: &SeedValue,
    ) -> bool {
        let table = reference.qualified_table();
        let key = value.key_text();
        let matches =
            |row: &SeedRow| row.get(&reference.column).and_then(SeedValue::key_text) == key;
        let committed = self
            .tables
            .get(&table)
            .is_some_and(|t| t.rows.iter().any(matches));
        committed || (table == own_table && staged.iter().any(matches))
    }
}

/// Column sets that must be distinct across rows: the primary key as a
/// whole, then every UNIQUE column on its own.
fn unique_keys(descriptor: &TableDescriptor) -> Vec<Vec<&str>> {
    let primary: Vec<&str> = descriptor
        .primary_key_columns()
        .map(|c| c.name.as_str())
        .collect();
    let single_primary = primary.len() == 1;
    let unique = descriptor
        .columns
        .iter()
        .filter(|c| c.is_unique && !(c.is_primary_key && single_primary))
        .map(|c| vec![c.name.as_str()]);

    Some(primary)
        .filter(|p| !p.is_empty())
        .into_iter()
        .chain(unique)
        .collect()
}

/// Key of `row` over `columns`; `None` if any part is NULL.
fn key_of(row: &SeedRow, columns: &[&str]) -> Option<Vec<String>> {
    columns
        .iter()
        .map(|c| row.get(c).and_then(SeedValue::key_text))
        .collect()
}

fn violation(table: &str, message: String) -> SeedError {
    SeedError::InsertFailure {
        table: table.to_string(),
        message,
    }
}

fn compare_keys(a: &SeedValue, b: &SeedValue) -> Ordering {
    match (a, b) {
        (SeedValue::Integer(x), SeedValue::Integer(y)) => x.cmp(y),
        _ => a.key_text().cmp(&b.key_text()),
    }
}

#[async_trait]
impl SeedTarget for MemoryTarget {
    async fn describe(&self, table: &str) -> Result<TableDescriptor, SeedError> {
        Ok(self.lock().table(table)?.descriptor.clone())
    }

    async fn foreign_keys(&self, tables: &[String]) -> Result<Vec<ForeignKeyEdge>, SeedError> {
        let state = self.lock();
        Ok(tables
            .iter()
            .filter_map(|name| state.tables.get(name))
            .flat_map(|t| {
                t.descriptor.foreign_key_columns().filter_map(move |c| {
                    c.foreign_key.as_ref().map(|fk| {
                        let edge =
                            ForeignKeyEdge::new(&t.descriptor.name, &c.name, &fk.table, &fk.column);
                        match &fk.schema {
                            Some(schema) => edge.with_referenced_schema(schema),
                            None => edge,
                        }
                    })
                })
            })
            .collect())
    }

    async fn row_count(&self, table: &str) -> Result<u64, SeedError> {
        Ok(self.lock().table(table)?.rows.len() as u64)
    }

    async fn sample_keys(
        &self,
        target: &ForeignKeyRef,
        limit: usize,
    ) -> Result<Vec<SeedValue>, SeedError> {
        let table = target.qualified_table();
        let state = self.lock();
        if let Some(error) = state.sample_failures.get(&table) {
            return Err(error.clone());
        }

        let mut values: Vec<SeedValue> = state
            .table(&table)?
            .rows
            .iter()
            .filter_map(|row| row.get(&target.column))
            .filter(|v| !v.is_null())
            .cloned()
            .collect();
        values.sort_by(compare_keys);
        values.dedup();
        values.truncate(limit);
        Ok(values)
    }

    async fn insert_rows(
        &self,
        table: &TableDescriptor,
        columns: &[String],
        rows: &[SeedRow],
        batch_size: usize,
    ) -> Result<u64, SeedError> {
        let mut state = self.lock();
        state.inserts.push(table.name.clone());

        if let Some(error) = state.failures.get(&table.name) {
            return Err(error.clone());
        }

        let live = state.table(&table.name)?;
        let descriptor = live.descriptor.clone();
        let mut next_id = live.next_id;
        let unique = unique_keys(&descriptor);

        for name in columns {
            match descriptor.column(name) {
                None => {
                    return Err(violation(
                        &table.name,
                        format!("column \"{name}\" does not exist"),
                    ))
                }
                Some(c) if c.is_generated => {
                    return Err(violation(
                        &table.name,
                        format!("cannot insert into generated column \"{name}\""),
                    ))
                }
                Some(_) => {}
            }
        }

        // Stage everything first so a failing row leaves the table untouched
        let mut staged: Vec<SeedRow> = Vec::with_capacity(rows.len());
        for row in rows {
            let mut stored = SeedRow::new(row.index);
            for name in columns {
                if let Some(value) = row.get(name) {
                    stored.set(name.clone(), value.clone());
                }
            }

            for column in &descriptor.columns {
                let value = stored.get(&column.name).cloned().unwrap_or(SeedValue::Null);
                if value.is_null() {
                    if column.is_auto_key() && matches!(column.column_type, ColumnType::Integer) {
                        stored.set(column.name.clone(), next_id);
                        next_id += 1;
                    } else if !column.nullable && !column.has_default {
                        return Err(violation(
                            &table.name,
                            format!(
                                "null value in column \"{}\" violates not-null constraint",
                                column.name
                            ),
                        ));
                    }
                    continue;
                }

                if let Some(fk) = &column.foreign_key {
                    if !state.key_exists(&staged, &table.name, fk, &value) {
                        return Err(violation(
                            &table.name,
                            format!(
                                "insert violates foreign key: {}={} is not present in \"{}\"",
                                column.name,
                                value.key_text().unwrap_or_default(),
                                fk.qualified_table()
                            ),
                        ));
                    }
                }
            }

            let committed = &state.table(&table.name)?.rows;
            for key_columns in &unique {
                let Some(key) = key_of(&stored, key_columns) else {
                    continue;
                };
                let taken = committed
                    .iter()
                    .chain(&staged)
                    .any(|other| key_of(other, key_columns).as_ref() == Some(&key));
                if taken {
                    return Err(violation(
                        &table.name,
                        format!(
                            "duplicate key value violates unique constraint: ({})=({})",
                            key_columns.join(", "),
                            key.join(", ")
                        ),
                    ));
                }
            }
            staged.push(stored);
        }

        let batches = staged.len().div_ceil(batch_size.max(1));
        let inserted = staged.len() as u64;
        if let Some(t) = state.tables.get_mut(&table.name) {
            t.rows.extend(staged);
            t.next_id = next_id;
            t.batches += batches;
        }
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_not_null_enforced_atomically() {
        let target = MemoryTarget::school();
        let users = MemoryTarget::school_table("users");
        let rows = vec![
            SeedRow::new(0).with("email", "a@example.com"),
            SeedRow::new(1).with("display_name", "no email"),
        ];
        let columns = vec!["email".to_string(), "display_name".to_string()];

        let err = target.insert_rows(&users, &columns, &rows, 1).await.unwrap_err();
        assert_eq!(err.kind(), "insert_failure");
        assert_eq!(target.row_count("users").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_foreign_key_enforced() {
        let target = MemoryTarget::school();
        let orgs = MemoryTarget::school_table("organizations");
        let rows = vec![SeedRow::new(0).with("name", "acme").with("owner_id", 1)];
        let columns = vec!["name".to_string(), "owner_id".to_string()];

        assert!(target.insert_rows(&orgs, &columns, &rows, 10).await.is_err());

        target.put_rows("users", [SeedRow::new(0).with("id", 1).with("email", "a")]);
        assert_eq!(target.insert_rows(&orgs, &columns, &rows, 10).await.unwrap(), 1);
        assert_eq!(target.column_values("organizations", "id"), vec![SeedValue::Integer(1)]);
    }

    #[tokio::test]
    async fn test_sample_keys_sorted_and_limited() {
        let target = MemoryTarget::school();
        target.put_rows(
            "users",
            [10, 2, 33, 2].map(|id| SeedRow::new(0).with("id", id).with("email", "x")),
        );
        assert_eq!(
            target
                .sample_keys(&ForeignKeyRef::new("users", "id"), 2)
                .await
                .unwrap(),
            vec![SeedValue::Integer(2), SeedValue::Integer(10)]
        );
        assert!(matches!(
            target.sample_keys(&ForeignKeyRef::new("nope", "id"), 2).await,
            Err(SeedError::SchemaNotFound(_))
        ));
    }

    fn profiles() -> TableDescriptor {
        TableDescriptor::new(
            "profiles",
            vec![
                ColumnDescriptor::new("user_id", ColumnType::Integer, "int4")
                    .primary_key()
                    .references("users", "id"),
                ColumnDescriptor::new("handle", ColumnType::text(), "text")
                    .nullable()
                    .unique(),
            ],
        )
    }

    #[tokio::test]
    async fn test_primary_key_must_be_distinct() {
        let target = MemoryTarget::school().with_table(profiles());
        target.put_rows(
            "users",
            [1, 2].map(|id| SeedRow::new(0).with("id", id).with("email", "x")),
        );
        let columns = vec!["user_id".to_string()];

        // duplicate within one call
        let rows = vec![
            SeedRow::new(0).with("user_id", 1),
            SeedRow::new(1).with("user_id", 2),
            SeedRow::new(2).with("user_id", 1),
        ];
        let err = target
            .insert_rows(&profiles(), &columns, &rows, 10)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("duplicate key"), "{err}");
        assert_eq!(target.row_count("profiles").await.unwrap(), 0);

        // duplicate of a committed row
        let first = vec![SeedRow::new(0).with("user_id", 1)];
        target.insert_rows(&profiles(), &columns, &first, 10).await.unwrap();
        assert!(target.insert_rows(&profiles(), &columns, &first, 10).await.is_err());
        assert_eq!(target.row_count("profiles").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unique_column_allows_repeated_nulls() {
        let target = MemoryTarget::school().with_table(profiles());
        target.put_rows(
            "users",
            [1, 2, 3, 4].map(|id| SeedRow::new(0).with("id", id).with("email", "x")),
        );
        let columns = vec!["user_id".to_string(), "handle".to_string()];

        let rows = vec![
            SeedRow::new(0).with("user_id", 1).with("handle", SeedValue::Null),
            SeedRow::new(1).with("user_id", 2).with("handle", SeedValue::Null),
        ];
        assert_eq!(target.insert_rows(&profiles(), &columns, &rows, 10).await.unwrap(), 2);

        let clash = vec![
            SeedRow::new(0).with("user_id", 3).with("handle", "ada"),
            SeedRow::new(1).with("user_id", 4).with("handle", "ada"),
        ];
        assert!(target.insert_rows(&profiles(), &columns, &clash, 10).await.is_err());
    }
}
