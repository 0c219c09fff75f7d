//! Foreign key value resolution for one table pass.

use seed_core::{
    ForeignKeyRef, ReferencePool, SeedError, SeedRow, SeedTarget, SeedValue, TableDescriptor,
};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Samples existing keys of referenced tables.
///
/// A resolver lives for exactly one table pass. Its cache never outlives
/// that pass, so keys committed by an earlier table in the same run are
/// always seen by the next one.
pub struct ReferenceResolver<'a, T: SeedTarget + ?Sized> {
    target: &'a T,
    table: String,
    limit: usize,
    cache: HashMap<ForeignKeyRef, Vec<SeedValue>>,
}

impl<'a, T: SeedTarget + ?Sized> ReferenceResolver<'a, T> {
    /// Fresh resolver for seeding `table`.
    pub fn for_table(target: &'a T, table: impl Into<String>, limit: usize) -> Self {
        Self {
            target,
            table: table.into(),
            limit: limit.max(1),
            cache: HashMap::new(),
        }
    }

    /// Up to `limit` existing values of the referenced column in ascending
    /// order; empty when the referenced table has no rows.
    pub async fn sample(&mut self, reference: &ForeignKeyRef) -> Result<Vec<SeedValue>, SeedError> {
        if let Some(values) = self.cache.get(reference) {
            return Ok(values.clone());
        }

        let values = self.target.sample_keys(reference, self.limit).await?;
        debug!(
            table = %self.table,
            target = %reference.qualified_table(),
            column = %reference.column,
            sampled = values.len(),
            "Sampled reference keys"
        );
        self.cache.insert(reference.clone(), values.clone());
        Ok(values)
    }

    /// Build the reference pool for every foreign key column of `descriptor`.
    ///
    /// A required column whose target is empty fails with
    /// [`SeedError::UnresolvedForeignKey`]; a nullable one is recorded as
    /// unresolved. Sampling failures are reported against `descriptor`.
    pub async fn resolve(
        &mut self,
        descriptor: &TableDescriptor,
    ) -> Result<ReferencePool, SeedError> {
        let mut pool = ReferencePool::new();

        for column in descriptor.writable_columns() {
            let Some(fk) = &column.foreign_key else {
                continue;
            };
            let unresolved = || SeedError::UnresolvedForeignKey {
                table: descriptor.name.clone(),
                column: column.name.clone(),
                target: fk.qualified_table(),
            };

            let values = match self.sample(fk).await {
                Ok(values) => values,
                Err(SeedError::SchemaNotFound(_)) => return Err(unresolved()),
                Err(SeedError::Database(message)) => {
                    return Err(SeedError::Database(format!(
                        "sampling {}.{} for '{}': {message}",
                        fk.qualified_table(),
                        fk.column,
                        descriptor.name
                    )))
                }
                Err(e) => return Err(e),
            };

            if values.is_empty() {
                if !column.nullable {
                    return Err(unresolved());
                }
                warn!(
                    table = %descriptor.name,
                    column = %column.name,
                    target = %fk.qualified_table(),
                    "Referenced table is empty, column will be left NULL"
                );
            }
            pool.insert(column.name.clone(), values);
        }

        Ok(pool)
    }
}

/// Remove unresolved foreign key columns from every row.
pub fn strip_unresolved(pool: &ReferencePool, rows: &mut [SeedRow]) {
    let unresolved: Vec<&str> = pool.unresolved_columns().collect();
    if unresolved.is_empty() {
        return;
    }
    for row in rows.iter_mut() {
        for column in &unresolved {
            row.remove(column);
        }
    }
}

/// Check that every non-null foreign key value was drawn from the pool.
///
/// Catches synthesizers that invent keys instead of using the sample.
pub fn check_references(
    descriptor: &TableDescriptor,
    pool: &ReferencePool,
    rows: &[SeedRow],
) -> Result<(), SeedError> {
    for column in descriptor.foreign_key_columns() {
        let Some(fk) = &column.foreign_key else {
            continue;
        };
        for row in rows {
            match row.get(&column.name) {
                None | Some(SeedValue::Null) => {}
                Some(value) if pool.contains_value(&column.name, value) => {}
                Some(value) => {
                    warn!(
                        table = %descriptor.name,
                        column = %column.name,
                        row = row.index,
                        value = ?value,
                        "Foreign key value not present in referenced table"
                    );
                    return Err(SeedError::UnresolvedForeignKey {
                        table: descriptor.name.clone(),
                        column: column.name.clone(),
                        target: fk.qualified_table(),
                    });
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryTarget;
    use seed_core::{ColumnDescriptor, ColumnType};

    fn students() -> TableDescriptor {
        TableDescriptor::new(
            "students",
            vec![
                ColumnDescriptor::serial_key("id"),
                ColumnDescriptor::new("user_id", ColumnType::Integer, "int4")
                    .references("users", "id"),
                ColumnDescriptor::new("organization_id", ColumnType::Integer, "int4")
                    .nullable()
                    .references("organizations", "id"),
            ],
        )
    }

    #[tokio::test]
    async fn test_required_reference_to_empty_table() {
        let target = MemoryTarget::school();
        let mut resolver = ReferenceResolver::for_table(&target, "students", 10);

        let err = resolver.resolve(&students()).await.unwrap_err();
        assert_eq!(
            err,
            SeedError::UnresolvedForeignKey {
                table: "students".into(),
                column: "user_id".into(),
                target: "users".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_nullable_reference_marked_unresolved() {
        let target = MemoryTarget::school();
        target.put_rows(
            "users",
            (1..=3).map(|i| {
                SeedRow::new(i)
                    .with("id", i as i64)
                    .with("email", format!("u{i}"))
            }),
        );

        let mut resolver = ReferenceResolver::for_table(&target, "students", 2);
        let pool = resolver.resolve(&students()).await.unwrap();

        assert_eq!(
            pool.values("user_id").unwrap(),
            &[SeedValue::Integer(1), SeedValue::Integer(2)]
        );
        assert!(pool.is_unresolved("organization_id"));
    }

    #[tokio::test]
    async fn test_samples_cached_within_pass() {
        let target = MemoryTarget::school();
        target.put_rows("users", [SeedRow::new(0).with("id", 7).with("email", "a")]);

        let users = ForeignKeyRef::new("users", "id");
        let mut resolver = ReferenceResolver::for_table(&target, "students", 10);
        let first = resolver.sample(&users).await.unwrap();
        target.put_rows("users", [SeedRow::new(1).with("id", 8).with("email", "b")]);
        assert_eq!(resolver.sample(&users).await.unwrap(), first);

        let mut next_pass = ReferenceResolver::for_table(&target, "students", 10);
        assert_eq!(next_pass.sample(&users).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_reference_into_other_schema() {
        // a same-named table in the seeded schema must not be sampled
        let target = MemoryTarget::school().with_table(TableDescriptor::new(
            "auth.users",
            vec![ColumnDescriptor::serial_key("id")],
        ));
        target.put_rows("auth.users", [SeedRow::new(0).with("id", 40)]);

        let accounts = TableDescriptor::new(
            "accounts",
            vec![ColumnDescriptor::new("user_id", ColumnType::Integer, "int4")
                .with_foreign_key(ForeignKeyRef::new("users", "id").in_schema("auth"))],
        );
        let mut resolver = ReferenceResolver::for_table(&target, "accounts", 10);
        let pool = resolver.resolve(&accounts).await.unwrap();
        assert_eq!(pool.values("user_id").unwrap(), &[SeedValue::Integer(40)]);

        let orphans = TableDescriptor::new(
            "orphans",
            vec![ColumnDescriptor::new("user_id", ColumnType::Integer, "int4")
                .nullable()
                .with_foreign_key(ForeignKeyRef::new("users", "id").in_schema("billing"))],
        );
        let mut resolver = ReferenceResolver::for_table(&target, "orphans", 10);
        assert_eq!(
            resolver.resolve(&orphans).await.unwrap_err(),
            SeedError::UnresolvedForeignKey {
                table: "orphans".into(),
                column: "user_id".into(),
                target: "billing.users".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_sampling_failure_reported_against_seeded_table() {
        let target = MemoryTarget::school();
        target.fail_samples("users", SeedError::Database("permission denied".into()));

        let mut resolver = ReferenceResolver::for_table(&target, "students", 10);
        let err = resolver.resolve(&students()).await.unwrap_err();
        assert_eq!(
            err,
            SeedError::Database("sampling users.id for 'students': permission denied".into())
        );
    }

    #[test]
    fn test_fabricated_key_detected() {
        let mut pool = ReferencePool::new();
        pool.insert("user_id", vec![SeedValue::Integer(1)]);
        pool.insert("organization_id", vec![]);

        let ok = vec![SeedRow::new(0).with("user_id", 1)];
        assert!(check_references(&students(), &pool, &ok).is_ok());

        let fabricated = vec![
            SeedRow::new(0).with("user_id", 1),
            SeedRow::new(1).with("user_id", 2),
        ];
        assert!(matches!(
            check_references(&students(), &pool, &fabricated),
            Err(SeedError::UnresolvedForeignKey { ref column, .. }) if column == "user_id"
        ));
    }

    #[test]
    fn test_strip_unresolved() {
        let mut pool = ReferencePool::new();
        pool.insert("organization_id", vec![]);
        let mut rows = vec![SeedRow::new(0).with("user_id", 1).with("organization_id", 5)];
        strip_unresolved(&pool, &mut rows);
        assert!(!rows[0].contains("organization_id"));
        assert!(rows[0].contains("user_id"));
    }
}
