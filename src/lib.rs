//! tableseed library
//!
//! Dependency-ordered, schema-introspecting bulk data seeding for an
//! existing PostgreSQL schema.
//!
//! # Features
//!
//! - Live introspection: column shapes always come from the catalog
//! - Dependency ordering: referenced tables are seeded before their dependents
//! - Referential safety: foreign keys only ever point at rows that exist
//! - Failure isolation: one transaction per table, a failed table never aborts the run
//! - Idempotency: tables that already hold rows are left alone
//!
//! # Crates
//!
//! - `seed_core` - shared types, dependency graph, traits
//! - `seed_generator` - default record synthesizer
//! - `seed_postgresql` - PostgreSQL seed target
//!
//! # CLI Usage
//!
//! ```bash
//! # Seed three tables with 200 rows each
//! tableseed --postgresql-connection-string postgresql://... \
//!   --tables users,organizations,students --row-count 200
//!
//! # Show the plan only
//! tableseed --postgresql-connection-string postgresql://... --config seed.yaml --dry-run
//! ```

pub mod config;
pub mod coordinator;
pub mod loader;
pub mod resolver;
pub mod testing;

pub use coordinator::{Coordinator, CoordinatorOptions};
pub use loader::BatchLoader;
pub use resolver::ReferenceResolver;
