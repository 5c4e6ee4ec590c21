//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.
//!
//! A complete configuration file looks like:
//!
//! ```toml
//! [datasets]
//! input_dir = "entrada"
//! sizes = [1000003, 2000003]
//!
//! [sort]
//! threads = 8
//!
//! [stats]
//! percentile = "nearest"
//! sort_check = "full"
//!
//! [network]
//! tag = 0
//!
//! [output]
//! precision = 12
//! json_output = "reports.json"
//! ```
//!
//! Every section and field is optional.

pub mod cli;
pub mod cli_convert;
pub mod toml;
pub mod validator;

use crate::ingest::DatasetId;
use crate::stats::StatsOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete run configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub datasets: DatasetConfig,
    #[serde(default)]
    pub sort: SortConfig,
    #[serde(default)]
    pub stats: StatsOptions,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Which datasets to ingest and where they live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Directory holding `<N>.txt` files
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,
    /// Dataset identifiers (expected element counts), in assignment order
    #[serde(default = "default_sizes")]
    pub sizes: Vec<u64>,
}

impl DatasetConfig {
    /// Dataset identifiers in configured order, duplicates removed
    pub fn ids(&self) -> Vec<DatasetId> {
        let mut ids: Vec<DatasetId> = Vec::with_capacity(self.sizes.len());
        for &size in &self.sizes {
            let id = DatasetId(size);
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            sizes: default_sizes(),
        }
    }
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("entrada")
}

/// The reference batch of datasets
fn default_sizes() -> Vec<u64> {
    vec![
        1000003, 2000003, 3000003, 4000003,
        10000001, 10000003, 10000005, 10000011, 10000021, 10000055,
        12000123, 12000155, 13000155, 13010155, 15000121,
    ]
}

/// Parallel sorter settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortConfig {
    /// Sort threads per process (0 = one per CPU core)
    #[serde(default)]
    pub threads: usize,
}

/// Distribution protocol settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Tag carried by every frame; both sides must agree
    #[serde(default)]
    pub tag: u32,
    /// Largest frame accepted from a peer
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            tag: crate::distributed::protocol::DEFAULT_TAG,
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

fn default_max_frame_bytes() -> u64 {
    crate::distributed::protocol::DEFAULT_MAX_FRAME_BYTES
}

/// Report output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Significant digits in report lines
    #[serde(default = "default_precision")]
    pub precision: usize,
    /// Write all reports as JSON to this file
    #[serde(default)]
    pub json_output: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            precision: default_precision(),
            json_output: None,
        }
    }
}

fn default_precision() -> usize {
    12
}
