//! PostgreSQL seed target for tableseed.
//!
//! [`PostgreSQLTarget`] implements [`seed_core::SeedTarget`]: it describes
//! tables from the live catalog, samples referenced keys, counts rows and
//! writes synthesized rows in batches, one transaction per table.
//!
//! ```ignore
//! use seed_postgresql::PostgreSQLTarget;
//! use std::time::Duration;
//!
//! let target = PostgreSQLTarget::connect(&connection_string, "public")
//!     .await?
//!     .with_statement_timeout(Duration::from_secs(30));
//! ```

pub mod args;
pub mod catalog;
pub mod error;
pub mod insert;
pub mod target;
pub mod value;

pub use args::{CommonSeedArgs, PostgreSQLSeedArgs};
pub use error::PostgreSQLSeedError;
pub use target::{PostgreSQLTarget, DEFAULT_LOCK_TIMEOUT, DEFAULT_STATEMENT_TIMEOUT};
