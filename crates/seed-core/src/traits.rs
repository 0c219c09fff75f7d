//! Seams between the seeding engine and its collaborators.

use crate::error::SeedError;
use crate::reference::ReferencePool;
use crate::schema::{ForeignKeyEdge, ForeignKeyRef, TableDescriptor};
use crate::values::{SeedRow, SeedValue};
use std::sync::Arc;

/// A database the engine can introspect and write to.
///
/// Implementations own their connection. The engine calls them strictly
/// sequentially, one table at a time.
///
/// # Usage Pattern
///
/// ```ignore
/// pub async fn seed<T: SeedTarget>(target: &T, table: &str) -> Result<(), SeedError> {
///     let descriptor = target.describe(table).await?;
///     if target.row_count(table).await? == 0 { /* ... */ }
///     Ok(())
/// }
/// ```
#[async_trait::async_trait]
pub trait SeedTarget: Send + Sync {
    /// Describe `table` from live metadata.
    ///
    /// Fails with [`SeedError::SchemaNotFound`] when the table does not exist.
    async fn describe(&self, table: &str) -> Result<TableDescriptor, SeedError>;

    /// Foreign key edges originating from any of `tables`.
    async fn foreign_keys(&self, tables: &[String]) -> Result<Vec<ForeignKeyEdge>, SeedError>;

    /// Current number of rows in `table`.
    async fn row_count(&self, table: &str) -> Result<u64, SeedError>;

    /// Up to `limit` non-null values of the referenced column, ascending.
    /// `target.schema` overrides the schema being seeded.
    async fn sample_keys(
        &self,
        target: &ForeignKeyRef,
        limit: usize,
    ) -> Result<Vec<SeedValue>, SeedError>;

    /// Insert `rows` into `table` writing exactly `columns`.
    ///
    /// All batches of one call share a single transaction: either every
    /// row is committed or none is. Returns the number of rows inserted.
    async fn insert_rows(
        &self,
        table: &TableDescriptor,
        columns: &[String],
        rows: &[SeedRow],
        batch_size: usize,
    ) -> Result<u64, SeedError>;
}

#[async_trait::async_trait]
impl<T: SeedTarget + ?Sized> SeedTarget for Arc<T> {
    async fn describe(&self, table: &str) -> Result<TableDescriptor, SeedError> {
        (**self).describe(table).await
    }

    async fn foreign_keys(&self, tables: &[String]) -> Result<Vec<ForeignKeyEdge>, SeedError> {
        (**self).foreign_keys(tables).await
    }

    async fn row_count(&self, table: &str) -> Result<u64, SeedError> {
        (**self).row_count(table).await
    }

    async fn sample_keys(
        &self,
        target: &ForeignKeyRef,
        limit: usize,
    ) -> Result<Vec<SeedValue>, SeedError> {
        (**self).sample_keys(target, limit).await
    }

    async fn insert_rows(
        &self,
        table: &TableDescriptor,
        columns: &[String],
        rows: &[SeedRow],
        batch_size: usize,
    ) -> Result<u64, SeedError> {
        (**self).insert_rows(table, columns, rows, batch_size).await
    }
}

/// Produces synthetic rows for a table.
///
/// Foreign key columns must be stamped only with values taken from
/// `references`. Columns the pool reports as unresolved are left out.
pub trait RecordSynthesizer: Send {
    fn synthesize(
        &mut self,
        table: &TableDescriptor,
        references: &ReferencePool,
        count: u64,
    ) -> Result<Vec<SeedRow>, SeedError>;
}

impl<S: RecordSynthesizer + ?Sized> RecordSynthesizer for Box<S> {
    fn synthesize(
        &mut self,
        table: &TableDescriptor,
        references: &ReferencePool,
        count: u64,
    ) -> Result<Vec<SeedRow>, SeedError> {
        (**self).synthesize(table, references, count)
    }
}
