//! Seed configuration assembly for the CLI.
//!
//! The YAML file is optional; command-line flags override whatever it sets.

mod duration;

pub use duration::parse_duration;

use anyhow::Context;
use seed_core::{ConfigError, SeedConfig};
use seed_postgresql::CommonSeedArgs;

/// Load the configuration file (if any) and apply CLI overrides.
pub fn load_seed_config(args: &CommonSeedArgs) -> anyhow::Result<SeedConfig> {
    let config = match &args.config {
        Some(path) => SeedConfig::from_file(path)
            .with_context(|| format!("Failed to load seed config from {path:?}"))?,
        None => SeedConfig::default(),
    };
    apply_overrides(config, args).context("Invalid seed configuration")
}

/// Apply CLI flags on top of `config` and re-validate.
pub fn apply_overrides(
    mut config: SeedConfig,
    args: &CommonSeedArgs,
) -> Result<SeedConfig, ConfigError> {
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(row_count) = args.row_count {
        config.default_row_count = row_count;
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = Some(batch_size);
    }
    if let Some(limit) = args.reference_limit {
        config.reference_sample_limit = limit;
    }
    config.validate()?;
    Ok(config)
}

/// Tables to seed: `--tables` when given, otherwise every table the
/// configuration names.
pub fn seed_tables(args: &CommonSeedArgs, config: &SeedConfig) -> Result<Vec<String>, ConfigError> {
    let tables: Vec<String> = if args.tables.is_empty() {
        config.table_names()
    } else {
        args.tables
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    };

    if tables.is_empty() {
        return Err(ConfigError::Invalid(
            "no tables to seed: pass --tables or list tables in the config".into(),
        ));
    }
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> CommonSeedArgs {
        CommonSeedArgs {
            config: None,
            tables: Vec::new(),
            row_count: None,
            batch_size: None,
            seed: None,
            reference_limit: None,
            dry_run: false,
        }
    }

    #[test]
    fn test_cli_overrides_config() {
        let config = SeedConfig::from_yaml("seed: 1\ndefault_row_count: 10\n").unwrap();
        let mut cli = args();
        cli.seed = Some(99);
        cli.row_count = Some(3);
        cli.reference_limit = Some(5);

        let config = apply_overrides(config, &cli).unwrap();
        assert_eq!(config.seed, 99);
        assert_eq!(config.default_row_count, 3);
        assert_eq!(config.reference_sample_limit, 5);
        assert_eq!(config.batch_size, None);
    }

    #[test]
    fn test_zero_row_count_rejected() {
        let mut cli = args();
        cli.row_count = Some(0);
        assert!(apply_overrides(SeedConfig::default(), &cli).is_err());
    }

    #[test]
    fn test_seed_tables_source() {
        let config = SeedConfig::from_yaml(
            "phase_groups:\n  - name: accounts\n    tables: [users]\ntables:\n  - name: students\n",
        )
        .unwrap();

        assert_eq!(seed_tables(&args(), &config).unwrap(), vec!["users", "students"]);

        let mut cli = args();
        cli.tables = vec!["orders".into(), " ".into()];
        assert_eq!(seed_tables(&cli, &config).unwrap(), vec!["orders"]);

        assert!(seed_tables(&args(), &SeedConfig::default()).is_err());
    }
}
