//! Error taxonomy shared by every seeding component.

use thiserror::Error;

/// Errors produced while planning or seeding.
///
/// Only errors raised while building the plan (`CyclicDependency`, and
/// `Database`/`Config` failures before the first table) abort a run. Every
/// other variant is contained to the table that raised it and recorded in
/// its [`SeedResult`](crate::SeedResult).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SeedError {
    /// Table is absent from the live database metadata.
    #[error("Table '{0}' not found in live schema")]
    SchemaNotFound(String),

    /// The seed plan cannot be ordered.
    #[error("Cyclic dependency between tables: {}", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    /// A required foreign key column has no usable reference values.
    #[error("Table '{table}': required foreign key '{column}' references '{target}', which has no rows")]
    UnresolvedForeignKey {
        table: String,
        column: String,
        target: String,
    },

    /// A batch insert was rejected by the database.
    #[error("Insert into '{table}' failed: {message}")]
    InsertFailure { table: String, message: String },

    /// A statement or lock wait exceeded the configured timeout.
    #[error("Statement timed out on '{table}': {message}")]
    StatementTimeout { table: String, message: String },

    /// The record synthesizer could not produce rows for a table.
    #[error("Synthesis failed for '{table}': {message}")]
    Synthesis { table: String, message: String },

    /// Connection or catalog failure outside of a table scope.
    #[error("Database error: {0}")]
    Database(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SeedError {
    /// Name of the table this error is scoped to, if any.
    pub fn table(&self) -> Option<&str> {
        match self {
            SeedError::SchemaNotFound(table) => Some(table),
            SeedError::UnresolvedForeignKey { table, .. }
            | SeedError::InsertFailure { table, .. }
            | SeedError::StatementTimeout { table, .. }
            | SeedError::Synthesis { table, .. } => Some(table),
            SeedError::CyclicDependency { .. } | SeedError::Database(_) | SeedError::Config(_) => {
                None
            }
        }
    }

    /// Short machine-friendly label, used in summaries and JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            SeedError::SchemaNotFound(_) => "schema_not_found",
            SeedError::CyclicDependency { .. } => "cyclic_dependency",
            SeedError::UnresolvedForeignKey { .. } => "unresolved_foreign_key",
            SeedError::InsertFailure { .. } => "insert_failure",
            SeedError::StatementTimeout { .. } => "statement_timeout",
            SeedError::Synthesis { .. } => "synthesis",
            SeedError::Database(_) => "database",
            SeedError::Config(_) => "config",
        }
    }
}
