//! JSON report output
//!
//! Writes every dataset report of a run into one pretty-printed file:
//!
//! ```json
//! {
//!   "generated_at": "2026-01-01T00:00:00Z",
//!   "mode": "local",
//!   "reports": [ { "dataset": 1000003, "rank": 1, "node_id": "...", "summary": { ... } } ]
//! }
//! ```

use crate::ingest::DatasetId;
use crate::stats::SummaryReport;
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// One dataset's report with where it was computed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonDatasetReport {
    pub dataset: DatasetId,
    /// Worker rank, absent in standalone mode
    pub rank: Option<usize>,
    pub node_id: String,
    /// Time spent sorting and summarizing (microseconds)
    pub elapsed_micros: u64,
    pub summary: SummaryReport,
}

/// Top-level JSON document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRunReport {
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub mode: String,
    pub reports: Vec<JsonDatasetReport>,
}

impl JsonRunReport {
    pub fn new(mode: impl Into<String>, reports: Vec<JsonDatasetReport>) -> Self {
        Self {
            generated_at: chrono::Utc::now(),
            mode: mode.into(),
            reports,
        }
    }
}

/// Write a run report as pretty JSON
pub fn write_reports(path: &Path, report: &JsonRunReport) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create JSON output file: {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)
        .with_context(|| format!("Failed to write JSON output: {}", path.display()))?;

    tracing::info!(path = %path.display(), reports = report.reports.len(), "JSON report written");
    Ok(())
}
