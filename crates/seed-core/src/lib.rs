//! Core types for tableseed.
//!
//! This crate provides the foundational types shared by the seeding
//! engine and its collaborators:
//!
//! - [`TableDescriptor`] / [`ColumnDescriptor`] - live table metadata
//! - [`ColumnType`] - type category of a column
//! - [`SeedValue`] / [`SeedRow`] - synthesized data
//! - [`DependencyGraph`] / [`SeedPlan`] - table ordering
//! - [`ReferencePool`] - foreign key values for one table pass
//! - [`SeedResult`] / [`RunSummary`] - outcomes
//! - [`SeedConfig`] - YAML configuration
//! - [`SeedTarget`] / [`RecordSynthesizer`] - collaborator traits
//!
//! # Architecture
//!
//! ```text
//! seed-core (this crate)
//!    │
//!    ├─── seed-generator   (implements RecordSynthesizer)
//!    ├─── seed-postgresql  (implements SeedTarget for PostgreSQL)
//!    └─── tableseed        (resolver, loader, coordinator, CLI)
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod reference;
pub mod result;
pub mod schema;
pub mod traits;
pub mod types;
pub mod values;

pub use config::{
    ColumnConfig, ConfigError, GeneratorConfig, PhaseGroup, SeedConfig, TableConfig,
    DEFAULT_REFERENCE_SAMPLE_LIMIT, DEFAULT_ROW_COUNT, DEFAULT_SEED,
};
pub use error::SeedError;
pub use graph::{DependencyGraph, PlannedTable, SeedPlan};
pub use reference::ReferencePool;
pub use result::{RunState, RunSummary, SeedResult, SkipReason};
pub use schema::{ColumnDescriptor, ForeignKeyEdge, ForeignKeyRef, TableDescriptor};
pub use traits::{RecordSynthesizer, SeedTarget};
pub use types::ColumnType;
pub use values::{SeedRow, SeedValue};
