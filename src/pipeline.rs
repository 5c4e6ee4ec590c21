//! Sort-then-summarize pipeline for a single dataset
//!
//! This is what a worker does with the sequence it owns once it has
//! received it, and what standalone mode does for every ingested dataset.

use crate::ingest::DatasetId;
use crate::sort::{ParallelSorter, TaskScheduler};
use crate::stats::{check_sorted, summarize, StatsError, StatsOptions, SummaryReport};
use crate::util::time::{calculate_rate, Stopwatch};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Summary of one dataset processed in this process
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetReport {
    pub dataset: DatasetId,
    pub summary: SummaryReport,
    pub elapsed: Duration,
}

/// Result of one dataset in a standalone batch
#[derive(Debug)]
pub enum DatasetOutcome {
    Completed(DatasetReport),
    Failed { dataset: DatasetId, error: StatsError },
}

impl DatasetOutcome {
    pub fn dataset(&self) -> DatasetId {
        match self {
            DatasetOutcome::Completed(report) => report.dataset,
            DatasetOutcome::Failed { dataset, .. } => *dataset,
        }
    }
}

/// Sort `values` in place and summarize them
///
/// The sortedness check runs between the two steps; a descending pair is
/// logged but does not abort the summary.
pub fn crunch<S: TaskScheduler>(
    values: &mut [f64],
    sorter: &ParallelSorter<S>,
    options: &StatsOptions,
) -> Result<SummaryReport, StatsError> {
    let _timer = Stopwatch::new(format!("DataMani{}", values.len()));

    let sort_timer = Stopwatch::new(format!("Sort{}", values.len()));
    sorter.sort(values);
    let sort_elapsed = sort_timer.elapsed();
    drop(sort_timer);

    tracing::debug!(
        size = values.len(),
        threads = sorter.scheduler().num_threads(),
        values_per_sec = calculate_rate(values.len(), sort_elapsed) as u64,
        "sorted"
    );

    if let Some(index) = check_sorted(values, options.sort_check) {
        tracing::warn!(
            size = values.len(),
            index,
            left = values[index],
            right = values[index + 1],
            "sequence not ordered after sort"
        );
    }

    summarize(values, options)
}

/// Crunch every dataset in `order`, one after another
///
/// Each dataset is consumed as it is processed. Identifiers missing from
/// `datasets` are skipped with a warning. A dataset that cannot be
/// summarized is recorded as failed and the batch moves on.
pub fn crunch_all<S: TaskScheduler>(
    mut datasets: BTreeMap<DatasetId, Vec<f64>>,
    order: &[DatasetId],
    sorter: &ParallelSorter<S>,
    options: &StatsOptions,
) -> Vec<DatasetOutcome> {
    let _timer = Stopwatch::new("Total Manipulation");
    let mut outcomes = Vec::with_capacity(order.len());

    for &dataset in order {
        let Some(mut values) = datasets.remove(&dataset) else {
            tracing::warn!(%dataset, "dataset not ingested, skipping");
            continue;
        };

        let started = Instant::now();
        let outcome = match crunch(&mut values, sorter, options) {
            Ok(summary) => DatasetOutcome::Completed(DatasetReport {
                dataset,
                summary,
                elapsed: started.elapsed(),
            }),
            Err(error) => {
                tracing::error!(%dataset, error = %error, "failed to summarize dataset");
                DatasetOutcome::Failed { dataset, error }
            }
        };
        outcomes.push(outcome);
    }

    outcomes
}
