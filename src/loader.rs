//! Batched, transactional writes of one table's rows.

use seed_core::{SeedError, SeedResult, SeedRow, SeedTarget, SkipReason, TableDescriptor};
use std::collections::BTreeSet;
use std::time::Instant;
use tracing::{debug, info};

/// Bytes of row data aimed for per INSERT statement.
pub const TARGET_BATCH_BYTES: usize = 64 * 1024;

/// Lower bound for estimated batch sizes.
pub const MIN_BATCH_SIZE: usize = 100;

/// Upper bound for estimated batch sizes.
pub const MAX_BATCH_SIZE: usize = 1000;

/// Bind parameter limit of a single PostgreSQL statement.
pub const MAX_BIND_PARAMETERS: usize = 65_535;

/// Rows per INSERT for `descriptor` writing `column_count` columns.
///
/// `configured` wins when set; otherwise the size is estimated from the
/// table's row width. Either way a batch never needs more bind parameters
/// than one statement can carry.
pub fn batch_size_for(
    descriptor: &TableDescriptor,
    column_count: usize,
    configured: Option<usize>,
) -> usize {
    let size = configured.unwrap_or_else(|| {
        (TARGET_BATCH_BYTES / descriptor.estimated_row_width())
            .clamp(MIN_BATCH_SIZE, MAX_BATCH_SIZE)
    });
    size.min(MAX_BIND_PARAMETERS / column_count.max(1)).max(1)
}

/// Writes synthesized rows through a [`SeedTarget`].
pub struct BatchLoader<'a, T: SeedTarget + ?Sized> {
    target: &'a T,
    batch_size: Option<usize>,
}

impl<'a, T: SeedTarget + ?Sized> BatchLoader<'a, T> {
    pub fn new(target: &'a T, batch_size: Option<usize>) -> Self {
        Self { target, batch_size }
    }

    /// Insert `rows` into the table described by `descriptor`.
    ///
    /// The table is left untouched when it already has rows. All rows go in
    /// one transaction; the result carries either the committed count or
    /// the error that rolled it back.
    pub async fn insert(&self, descriptor: &TableDescriptor, rows: &[SeedRow]) -> SeedResult {
        let started = Instant::now();
        let attempted = rows.len() as u64;
        let table = descriptor.name.as_str();

        let result = match self.load(descriptor, rows).await {
            Ok(Some(inserted)) => SeedResult::inserted(table, attempted, inserted),
            Ok(None) => SeedResult::skipped(table, SkipReason::AlreadyPopulated),
            Err(e) => SeedResult::failed(table, attempted, e),
        };
        result.with_duration(started.elapsed())
    }

    async fn load(
        &self,
        descriptor: &TableDescriptor,
        rows: &[SeedRow],
    ) -> Result<Option<u64>, SeedError> {
        let existing = self.target.row_count(&descriptor.name).await?;
        if existing > 0 {
            info!(table = %descriptor.name, existing, "Table already populated, skipping");
            return Ok(None);
        }

        let columns = insert_columns(descriptor, rows)?;
        let batch_size = batch_size_for(descriptor, columns.len(), self.batch_size);
        debug!(
            table = %descriptor.name,
            rows = rows.len(),
            columns = columns.len(),
            batch_size,
            "Writing rows"
        );

        let inserted = self
            .target
            .insert_rows(descriptor, &columns, rows, batch_size)
            .await?;
        Ok(Some(inserted))
    }
}

/// Columns carried by any row, in descriptor order.
///
/// Fails on a key that is not a column of the table or that names a
/// generated column.
pub fn insert_columns(
    descriptor: &TableDescriptor,
    rows: &[SeedRow],
) -> Result<Vec<String>, SeedError> {
    let present: BTreeSet<&str> = rows.iter().flat_map(|row| row.columns()).collect();

    for name in &present {
        match descriptor.column(name) {
            None => {
                return Err(SeedError::InsertFailure {
                    table: descriptor.name.clone(),
                    message: format!("unknown column '{name}'"),
                })
            }
            Some(column) if !column.is_insertable() => {
                return Err(SeedError::InsertFailure {
                    table: descriptor.name.clone(),
                    message: format!("column '{name}' is generated and cannot be written"),
                })
            }
            Some(_) => {}
        }
    }

    Ok(descriptor
        .columns
        .iter()
        .filter(|c| present.contains(c.name.as_str()))
        .map(|c| c.name.clone())
        .collect())
}
