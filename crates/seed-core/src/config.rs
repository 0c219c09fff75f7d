//! Seed configuration loaded from YAML.
//!
//! The configuration never describes column shapes (those always come from
//! the live catalog). It only carries what the catalog cannot know: which
//! tables to seed, how many rows, logical phase ordering and optional
//! generator overrides for individual columns.
//!
//! ```yaml
//! seed: 42
//! default_row_count: 50
//! reference_sample_limit: 500
//!
//! phase_groups:
//!   - name: accounts
//!     tables: [users, organizations]
//!   - name: health
//!     tables: [health_assessments]
//!   - name: goals
//!     tables: [fitness_goals]
//!
//! tables:
//!   - name: students
//!     row_count: 200
//!     columns:
//!       - name: email
//!         generator:
//!           type: pattern
//!           pattern: "student_{index}@example.com"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Default number of rows synthesized per table.
pub const DEFAULT_ROW_COUNT: u64 = 50;

/// Default bound on reference samples per foreign key target.
pub const DEFAULT_REFERENCE_SAMPLE_LIMIT: usize = 1000;

/// Default RNG seed.
pub const DEFAULT_SEED: u64 = 42;

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Error reading config file
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Error parsing YAML
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Semantically invalid configuration
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<ConfigError> for crate::SeedError {
    fn from(err: ConfigError) -> Self {
        crate::SeedError::Config(err.to_string())
    }
}

/// Value generator override for a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeneratorConfig {
    /// Random UUID v4 rendered as text
    UuidV4,

    /// Sequential integers starting at `start`
    Sequential {
        #[serde(default)]
        start: i64,
    },

    /// Pattern string; supports `{index}`, `{uuid}` and `{rand:N}`
    Pattern { pattern: String },

    /// Random integers in a range (inclusive)
    IntRange { min: i64, max: i64 },

    /// Random floats in a range (inclusive)
    FloatRange { min: f64, max: f64 },

    /// Random timestamps between two ISO 8601 instants or dates
    TimestampRange { start: String, end: String },

    /// Boolean with the given probability of `true`
    WeightedBool { true_weight: f64 },

    /// Random selection from a pool of values
    OneOf { values: Vec<serde_yaml::Value> },

    /// A fixed value
    Static { value: serde_yaml::Value },

    /// Always NULL
    Null,
}

impl GeneratorConfig {
    /// Reject parameters the random sources cannot sample from.
    fn validate(&self) -> Result<(), String> {
        match self {
            GeneratorConfig::FloatRange { min, max } if !min.is_finite() || !max.is_finite() => {
                Err(format!("float_range bounds must be finite, got {min}..{max}"))
            }
            GeneratorConfig::WeightedBool { true_weight } if !true_weight.is_finite() => {
                Err(format!("weighted_bool true_weight must be finite, got {true_weight}"))
            }
            _ => Ok(()),
        }
    }
}

/// Generator override for a named column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub name: String,
    pub generator: GeneratorConfig,
}

/// Per-table settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableConfig {
    pub name: String,

    /// Rows to synthesize; falls back to `default_row_count`
    #[serde(default)]
    pub row_count: Option<u64>,

    #[serde(default)]
    pub columns: Vec<ColumnConfig>,
}

/// Ordering constraint: every table of a group is seeded before every
/// table of the next declared group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseGroup {
    pub name: String,
    pub tables: Vec<String>,
}

impl PhaseGroup {
    pub fn new<I, S>(name: impl Into<String>, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            tables: tables.into_iter().map(Into::into).collect(),
        }
    }
}

/// Full seed configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedConfig {
    /// RNG seed for reproducible synthesis
    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default = "default_row_count")]
    pub default_row_count: u64,

    /// Fixed batch size; estimated per table from row width when absent
    #[serde(default)]
    pub batch_size: Option<usize>,

    #[serde(default = "default_reference_sample_limit")]
    pub reference_sample_limit: usize,

    #[serde(default)]
    pub phase_groups: Vec<PhaseGroup>,

    #[serde(default)]
    pub tables: Vec<TableConfig>,

    /// Cached table lookup (not serialized)
    #[serde(skip)]
    table_map: HashMap<String, usize>,
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

fn default_row_count() -> u64 {
    DEFAULT_ROW_COUNT
}

fn default_reference_sample_limit() -> usize {
    DEFAULT_REFERENCE_SAMPLE_LIMIT
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            default_row_count: DEFAULT_ROW_COUNT,
            batch_size: None,
            reference_sample_limit: DEFAULT_REFERENCE_SAMPLE_LIMIT,
            phase_groups: Vec::new(),
            tables: Vec::new(),
            table_map: HashMap::new(),
        }
    }
}

impl SeedConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: SeedConfig = serde_yaml::from_str(yaml)?;
        config.build_table_map();
        config.validate()?;
        Ok(config)
    }

    fn build_table_map(&mut self) {
        self.table_map = self
            .tables
            .iter()
            .enumerate()
            .map(|(idx, table)| (table.name.clone(), idx))
            .collect();
    }

    /// Reject settings that could never produce a successful run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_row_count == 0 {
            return Err(ConfigError::Invalid(
                "default_row_count must be greater than 0".into(),
            ));
        }
        if self.reference_sample_limit == 0 {
            return Err(ConfigError::Invalid(
                "reference_sample_limit must be greater than 0".into(),
            ));
        }
        if self.batch_size == Some(0) {
            return Err(ConfigError::Invalid("batch_size must be greater than 0".into()));
        }
        for group in &self.phase_groups {
            if group.name.trim().is_empty() {
                return Err(ConfigError::Invalid("phase group with empty name".into()));
            }
        }
        for table in &self.tables {
            if table.row_count == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "row_count for table '{}' must be greater than 0",
                    table.name
                )));
            }
            for column in &table.columns {
                column.generator.validate().map_err(|message| {
                    ConfigError::Invalid(format!("{}.{}: {message}", table.name, column.name))
                })?;
            }
        }
        Ok(())
    }

    /// Add a phase group (builder style, mostly for tests).
    pub fn with_phase_group(mut self, group: PhaseGroup) -> Self {
        self.phase_groups.push(group);
        self
    }

    /// Add or replace per-table settings.
    pub fn with_table(mut self, table: TableConfig) -> Self {
        match self.table_map.get(&table.name) {
            Some(&idx) => self.tables[idx] = table,
            None => {
                self.table_map.insert(table.name.clone(), self.tables.len());
                self.tables.push(table);
            }
        }
        self
    }

    pub fn get_table(&self, name: &str) -> Option<&TableConfig> {
        self.table_map
            .get(name)
            .and_then(|&idx| self.tables.get(idx))
    }

    /// Rows to synthesize for `table`.
    pub fn row_count_for(&self, table: &str) -> u64 {
        self.get_table(table)
            .and_then(|t| t.row_count)
            .unwrap_or(self.default_row_count)
    }

    /// Generator override for `table.column`, if configured.
    pub fn column_generator(&self, table: &str, column: &str) -> Option<&GeneratorConfig> {
        self.get_table(table)?
            .columns
            .iter()
            .find(|c| c.name == column)
            .map(|c| &c.generator)
    }

    /// Every table named by the configuration, phase groups first, in
    /// declaration order and without duplicates.
    pub fn table_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.phase_groups
            .iter()
            .flat_map(|g| g.tables.iter())
            .chain(self.tables.iter().map(|t| &t.name))
            .filter(|name| seen.insert(name.as_str()))
            .cloned()
            .collect()
    }
}
