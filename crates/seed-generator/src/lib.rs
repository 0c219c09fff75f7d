//! Default record synthesizer for tableseed.
//!
//! This crate provides the [`DataGenerator`], which fills the writable
//! columns of a live table with deterministic synthetic values. Shapes come
//! from the [`TableDescriptor`](seed_core::TableDescriptor); the optional
//! [`SeedConfig`](seed_core::SeedConfig) supplies the seed and per-column
//! generator overrides.
//!
//! # Architecture
//!
//! ```text
//! TableDescriptor + ReferencePool
//!        │
//!        ▼
//! ┌──────────────────────┐
//! │    DataGenerator     │
//! │                      │
//! │  - seed ^ fnv(table) │
//! │  - column overrides  │
//! └──────────┬───────────┘
//!            │
//!            ▼
//!    SeedRow { index, values }
//! ```
//!
//! # Example
//!
//! ```rust
//! use seed_core::{
//!     ColumnDescriptor, ColumnType, RecordSynthesizer, ReferencePool, TableDescriptor,
//! };
//! use seed_generator::DataGenerator;
//!
//! let table = TableDescriptor::new(
//!     "users",
//!     vec![
//!         ColumnDescriptor::serial_key("id"),
//!         ColumnDescriptor::new("email", ColumnType::text(), "text"),
//!     ],
//! );
//!
//! let mut generator = DataGenerator::with_seed(42);
//! let rows = generator.synthesize(&table, &ReferencePool::new(), 3).unwrap();
//! assert_eq!(rows.len(), 3);
//! ```
//!
//! # Generators
//!
//! Column overrides accept these generator types:
//!
//! - `uuid_v4` - Random UUID v4
//! - `sequential` - Sequential integers
//! - `pattern` - Pattern strings with placeholders (`{index}`, `{uuid}`, `{rand:N}`)
//! - `int_range` - Random integers in a range
//! - `float_range` - Random floats in a range
//! - `timestamp_range` - Random timestamps in a range
//! - `weighted_bool` - Boolean with configurable probability
//! - `one_of` - Random selection from a list
//! - `static` - Fixed value
//! - `null` - Always NULL

pub mod generator;
pub mod generators;

pub use generator::DataGenerator;
