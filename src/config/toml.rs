//! TOML configuration file parsing

use super::*;
use crate::config::cli::Cli;
use crate::config::cli_convert::convert_percentile_mode;
use crate::stats::SortCheckScope;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Merge CLI arguments with TOML configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: Config) -> Config {
    if let Some(ref dir) = cli.input_dir {
        config.datasets.input_dir = dir.clone();
    }
    if !cli.sizes.is_empty() {
        config.datasets.sizes = cli.sizes.clone();
    }

    if let Some(threads) = cli.threads {
        config.sort.threads = threads;
    }

    if let Some(mode) = cli.percentile {
        config.stats.percentile = convert_percentile_mode(mode);
    }
    if let Some(prefix) = cli.sort_check_prefix {
        config.stats.sort_check = SortCheckScope::Prefix(prefix);
    }

    if let Some(tag) = cli.tag {
        config.network.tag = tag;
    }

    if let Some(precision) = cli.precision {
        config.output.precision = precision;
    }
    if let Some(ref path) = cli.json_output {
        config.output.json_output = Some(path.clone());
    }

    config
}

/// Build the effective configuration: file (if any) overridden by CLI flags
pub fn build_config(cli: &Cli) -> Result<Config> {
    let base = match cli.config {
        Some(ref path) => parse_toml_file(path)?,
        None => Config::default(),
    };

    Ok(merge_cli_with_config(cli, base))
}
