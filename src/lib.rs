//! datacrunch - parallel sort and summary statistics over large numeric datasets
//!
//! datacrunch reads datasets of floating-point numbers, hands each one to a
//! worker process, sorts it with a fork-join quicksort and reports summary
//! statistics over the sorted values.
//!
//! # Architecture
//!
//! - **Parallel sort**: quicksort on an injected task scheduler (rayon pool or inline)
//! - **Statistics**: mean, geometric mean, population std dev, median, p95, extrema
//! - **Distributed mode**: one coordinator sends one dataset to each worker
//! - **Local mode**: coordinator and workers in one process over in-memory pipes

pub mod config;
pub mod distributed;
pub mod ingest;
pub mod output;
pub mod pipeline;
pub mod sort;
pub mod stats;
pub mod util;

// Re-export commonly used types
pub use config::Config;
pub use sort::ParallelSorter;
pub use stats::SummaryReport;

/// Result type used throughout datacrunch
pub type Result<T> = anyhow::Result<T>;
