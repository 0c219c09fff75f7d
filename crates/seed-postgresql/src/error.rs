//! Error types for the PostgreSQL seed target.

use seed_core::SeedError;
use thiserror::Error;
use tokio_postgres::error::SqlState;

/// Errors that can occur while talking to PostgreSQL.
#[derive(Error, Debug)]
pub enum PostgreSQLSeedError {
    /// PostgreSQL connection or query error.
    #[error("PostgreSQL error: {0}")]
    PostgreSQL(#[from] tokio_postgres::Error),

    /// Table not present in the configured schema.
    #[error("Table '{0}' not found in schema")]
    TableNotFound(String),

    /// A value could not be bound to its column.
    #[error("Cannot bind value for column '{column}': {message}")]
    Bind { column: String, message: String },
}

impl PostgreSQLSeedError {
    /// SQLSTATE reported by the server, if any.
    pub fn code(&self) -> Option<&SqlState> {
        match self {
            PostgreSQLSeedError::PostgreSQL(e) => e.code(),
            _ => None,
        }
    }

    /// Server-side message when available, the display form otherwise.
    fn detail(&self) -> String {
        match self {
            PostgreSQLSeedError::PostgreSQL(e) => match e.as_db_error() {
                Some(db) => db.message().to_string(),
                None => e.to_string(),
            },
            other => other.to_string(),
        }
    }

    /// Convert to the engine's error for a failure scoped to `table`.
    pub fn into_seed_error(self, table: &str) -> SeedError {
        match self.code() {
            Some(code)
                if *code == SqlState::QUERY_CANCELED || *code == SqlState::LOCK_NOT_AVAILABLE =>
            {
                SeedError::StatementTimeout {
                    table: table.to_string(),
                    message: self.detail(),
                }
            }
            Some(code) if *code == SqlState::UNDEFINED_TABLE => {
                SeedError::SchemaNotFound(table.to_string())
            }
            _ => match self {
                PostgreSQLSeedError::TableNotFound(name) => SeedError::SchemaNotFound(name),
                other => SeedError::InsertFailure {
                    table: table.to_string(),
                    message: other.detail(),
                },
            },
        }
    }
}

impl From<PostgreSQLSeedError> for SeedError {
    fn from(err: PostgreSQLSeedError) -> Self {
        match err {
            PostgreSQLSeedError::TableNotFound(name) => SeedError::SchemaNotFound(name),
            other => SeedError::Database(other.detail()),
        }
    }
}
