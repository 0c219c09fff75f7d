//! PostgreSQL implementation of [`SeedTarget`].

use crate::catalog;
use crate::error::PostgreSQLSeedError;
use crate::insert::{insert_batch, qualified_name, resolve_columns, transaction_settings};
use crate::value::quote_ident;
use seed_core::{
    ForeignKeyEdge, ForeignKeyRef, SeedError, SeedRow, SeedTarget, SeedValue, TableDescriptor,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, info};

/// Default `statement_timeout` for seeding transactions.
pub const DEFAULT_STATEMENT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default `lock_timeout` for seeding transactions.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// Seed target backed by a single PostgreSQL connection.
///
/// The client sits behind a mutex; an insert holds it for the whole table
/// transaction.
pub struct PostgreSQLTarget {
    client: Arc<Mutex<Client>>,
    schema: String,
    statement_timeout: Duration,
    lock_timeout: Duration,
}

impl PostgreSQLTarget {
    /// Connect and verify the connection.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let target = PostgreSQLTarget::connect(
    ///     "host=localhost user=postgres password=postgres dbname=app",
    ///     "public",
    /// ).await?;
    /// ```
    pub async fn connect(
        connection_string: &str,
        schema: impl Into<String>,
    ) -> Result<Self, PostgreSQLSeedError> {
        let (client, connection) = tokio_postgres::connect(connection_string, NoTls).await?;

        // Spawn the connection task
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("PostgreSQL connection error: {}", e);
            }
        });

        client.simple_query("SELECT 1").await?;

        let schema = schema.into();
        info!(schema = %schema, "Connected to PostgreSQL");
        Ok(Self::with_client(Arc::new(Mutex::new(client)), schema))
    }

    /// Wrap an existing client.
    pub fn with_client(client: Arc<Mutex<Client>>, schema: impl Into<String>) -> Self {
        Self {
            client,
            schema: schema.into(),
            statement_timeout: DEFAULT_STATEMENT_TIMEOUT,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = timeout;
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn client(&self) -> Arc<Mutex<Client>> {
        self.client.clone()
    }

    async fn write_rows(
        &self,
        table: &TableDescriptor,
        columns: &[String],
        rows: &[SeedRow],
        batch_size: usize,
    ) -> Result<u64, PostgreSQLSeedError> {
        let columns = resolve_columns(table, columns)?;
        let batch_size = batch_size.max(1);

        let mut client = self.client.lock().await;
        let tx = client.transaction().await?;

        let written = async {
            tx.batch_execute(&transaction_settings(
                &self.schema,
                self.statement_timeout,
                self.lock_timeout,
            ))
            .await?;

            let mut inserted = 0;
            for (batch, chunk) in rows.chunks(batch_size).enumerate() {
                inserted += insert_batch(&tx, &self.schema, table, &columns, chunk).await?;
                debug!(table = %table.name, batch, inserted, "Batch written");
            }
            Ok::<u64, PostgreSQLSeedError>(inserted)
        }
        .await;

        match written {
            Ok(inserted) => {
                tx.commit().await?;
                Ok(inserted)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(table = %table.name, error = %rollback, "Rollback failed");
                }
                Err(e)
            }
        }
    }
}

#[async_trait::async_trait]
impl SeedTarget for PostgreSQLTarget {
    async fn describe(&self, table: &str) -> Result<TableDescriptor, SeedError> {
        let client = self.client.lock().await;
        catalog::describe_table(&client, &self.schema, table)
            .await
            .map_err(SeedError::from)
    }

    async fn foreign_keys(&self, tables: &[String]) -> Result<Vec<ForeignKeyEdge>, SeedError> {
        let client = self.client.lock().await;
        catalog::foreign_keys(&client, &self.schema, tables)
            .await
            .map_err(SeedError::from)
    }

    async fn row_count(&self, table: &str) -> Result<u64, SeedError> {
        let sql = format!("SELECT count(*) FROM {}", qualified_name(&self.schema, table));
        let client = self.client.lock().await;
        let row = client
            .query_one(&sql, &[])
            .await
            .map_err(|e| PostgreSQLSeedError::from(e).into_seed_error(table))?;
        let count: i64 = row.get(0);
        Ok(count.max(0) as u64)
    }

    async fn sample_keys(
        &self,
        target: &ForeignKeyRef,
        limit: usize,
    ) -> Result<Vec<SeedValue>, SeedError> {
        let schema = target.schema.as_deref().unwrap_or(&self.schema);
        let col = quote_ident(&target.column);
        let sql = format!(
            "SELECT {col}::text, pg_typeof({col})::text FROM {} \
             WHERE {col} IS NOT NULL ORDER BY {col} LIMIT $1",
            qualified_name(schema, &target.table)
        );
        let limit = limit as i64;
        let client = self.client.lock().await;
        // reported against the table being seeded by the resolver
        let rows = client
            .query(&sql, &[&limit])
            .await
            .map_err(|e| SeedError::from(PostgreSQLSeedError::from(e)))?;

        Ok(rows
            .iter()
            .map(|row| {
                let text: String = row.get(0);
                let type_name: String = row.get(1);
                match type_name.as_str() {
                    "smallint" | "integer" | "bigint" => text
                        .parse::<i64>()
                        .map(SeedValue::Integer)
                        .unwrap_or(SeedValue::Text(text)),
                    _ => SeedValue::Text(text),
                }
            })
            .collect())
    }

    async fn insert_rows(
        &self,
        table: &TableDescriptor,
        columns: &[String],
        rows: &[SeedRow],
        batch_size: usize,
    ) -> Result<u64, SeedError> {
        self.write_rows(table, columns, rows, batch_size)
            .await
            .map_err(|e| e.into_seed_error(&table.name))
    }
}
