//! Configuration validation

use super::*;
use crate::stats::SortCheckScope;
use anyhow::Result;

/// Largest precision the report formatter supports
pub const MAX_PRECISION: usize = 17;

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_datasets(&config.datasets)?;
    validate_sort(&config.sort)?;
    validate_stats(&config.stats)?;
    validate_network(&config.network)?;
    validate_output(&config.output)?;

    Ok(())
}

/// Validate dataset configuration
pub fn validate_datasets(datasets: &DatasetConfig) -> Result<()> {
    if datasets.sizes.is_empty() {
        anyhow::bail!("at least one dataset size must be configured");
    }

    if let Some(index) = datasets.sizes.iter().position(|&size| size == 0) {
        anyhow::bail!("dataset size #{} is 0", index);
    }

    if datasets.ids().len() != datasets.sizes.len() {
        tracing::warn!("duplicate dataset sizes configured, each dataset is processed once");
    }

    Ok(())
}

/// Validate sort configuration
pub fn validate_sort(sort: &SortConfig) -> Result<()> {
    if sort.threads > 0 {
        crate::sort::scheduler::warn_if_oversubscribed(sort.threads);
    }
    Ok(())
}

/// Validate statistics configuration
pub fn validate_stats(stats: &StatsOptions) -> Result<()> {
    if stats.sort_check == SortCheckScope::Prefix(0) {
        anyhow::bail!("sort_check prefix must be greater than 0 (use \"full\" for the whole sequence)");
    }
    Ok(())
}

/// Validate network configuration
pub fn validate_network(network: &NetworkConfig) -> Result<()> {
    if network.max_frame_bytes == 0 {
        anyhow::bail!("max_frame_bytes must be greater than 0");
    }
    if network.max_frame_bytes > u32::MAX as u64 {
        anyhow::bail!(
            "max_frame_bytes ({}) exceeds the frame length field limit ({})",
            network.max_frame_bytes,
            u32::MAX
        );
    }
    Ok(())
}

/// Validate output configuration
pub fn validate_output(output: &OutputConfig) -> Result<()> {
    if output.precision == 0 || output.precision > MAX_PRECISION {
        anyhow::bail!(
            "precision must be between 1 and {}, got {}",
            MAX_PRECISION,
            output.precision
        );
    }
    Ok(())
}
