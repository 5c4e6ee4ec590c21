//! CLI argument parsing using clap

use crate::distributed::Role;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Execution mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExecutionMode {
    /// Single process: ingest, sort and summarize every dataset locally
    Standalone,
    /// Coordinator and workers in one process, connected by in-memory pipes
    Local,
    /// Ingest datasets and send one to each worker listed in --workers
    Coordinator,
    /// Wait for one dataset from the coordinator, sort and summarize it
    Worker,
}

/// 95th percentile convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PercentileMode {
    /// Element at floor(0.95 * (n - 1))
    Nearest,
    /// Element at index 0, as in the historical reports
    Legacy,
}

/// datacrunch - distributed parallel sort and summary statistics
#[derive(Parser, Debug)]
#[command(name = "datacrunch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Execution mode
    #[arg(long, value_enum, default_value = "standalone")]
    pub mode: ExecutionMode,

    /// Rank of this worker (worker mode only, >= 1)
    #[arg(long)]
    pub rank: Option<usize>,

    /// Port for the worker to listen on (worker mode only)
    #[arg(long, default_value = "9999")]
    pub listen_port: u16,

    /// Comma-separated worker addresses; the i-th address gets rank i+1
    /// (e.g., "10.0.1.10:9999,10.0.1.11:9999")
    #[arg(long)]
    pub workers: Option<String>,

    /// File containing worker addresses (one per line, coordinator mode)
    #[arg(long)]
    pub clients_file: Option<PathBuf>,

    /// Port used for worker addresses given without one
    #[arg(long, default_value = "9999")]
    pub worker_port: u16,

    /// Number of in-process workers (local mode only)
    #[arg(long, default_value = "2")]
    pub num_workers: usize,

    // === Dataset Options ===
    /// Directory containing <N>.txt dataset files
    #[arg(short = 'i', long)]
    pub input_dir: Option<PathBuf>,

    /// Comma-separated dataset sizes to process (e.g., "1000003,2000003")
    #[arg(long, value_delimiter = ',')]
    pub sizes: Vec<u64>,

    // === Sort Options ===
    /// Sort threads per process (0 = one per CPU core)
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    // === Statistics Options ===
    /// 95th percentile convention
    #[arg(long, value_enum)]
    pub percentile: Option<PercentileMode>,

    /// Only check the first N elements for ordering after sorting
    #[arg(long)]
    pub sort_check_prefix: Option<usize>,

    // === Protocol Options ===
    /// Message tag shared by coordinator and workers
    #[arg(long)]
    pub tag: Option<u32>,

    // === Output Options ===
    /// Significant digits in report lines
    #[arg(long)]
    pub precision: Option<usize>,

    /// Write all reports as JSON to this file
    #[arg(long)]
    pub json_output: Option<PathBuf>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, default_value = "info", env = "DATACRUNCH_LOG")]
    pub log_level: String,

    // === Configuration File ===
    /// TOML configuration file
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Dry run - validate configuration without executing
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Role of this process, fixed at startup
    ///
    /// Worker mode takes its rank from `--rank` (default 1); every other mode
    /// runs as the coordinator.
    pub fn role(&self) -> Role {
        match self.mode {
            ExecutionMode::Worker => Role::from_rank(self.rank.unwrap_or(1)),
            _ => Role::Coordinator,
        }
    }

    /// Validate CLI arguments
    pub fn validate(&self) -> anyhow::Result<()> {
        match self.mode {
            ExecutionMode::Worker => {
                if self.role() == Role::Coordinator {
                    anyhow::bail!("rank 0 is reserved for the coordinator");
                }
            }
            ExecutionMode::Coordinator => {
                if self.workers.is_none() && self.clients_file.is_none() {
                    anyhow::bail!("coordinator mode requires --workers or --clients-file");
                }
                if self.workers.is_some() && self.clients_file.is_some() {
                    anyhow::bail!("can only specify one of --workers or --clients-file");
                }
            }
            ExecutionMode::Local => {
                if self.num_workers == 0 {
                    anyhow::bail!("num_workers must be at least 1");
                }
            }
            ExecutionMode::Standalone => {}
        }

        if self.sizes.iter().any(|&size| size == 0) {
            anyhow::bail!("dataset sizes must be greater than 0");
        }

        Ok(())
    }
}
