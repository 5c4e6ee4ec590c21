//! Local distributed mode
//!
//! Runs the coordinator and `num_workers` node services in one process,
//! connected by in-memory pipes instead of TCP. Everything else is the
//! same code path as a real distributed run. The workers share one sort
//! scheduler.

use super::coordinator::{Coordinator, DistributionSummary, WorkerLink};
use super::node_service::NodeService;
use crate::config::Config;
use crate::ingest::DatasetId;
use crate::sort::{RayonScheduler, TaskScheduler};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Buffer size of each coordinator-worker pipe
pub const LOCAL_PIPE_CAPACITY: usize = 1 << 20;

/// Ingest the configured datasets and distribute them to in-process workers
pub async fn run_local(config: Arc<Config>, num_workers: usize) -> Result<DistributionSummary> {
    let scheduler = RayonScheduler::new(config.sort.threads)
        .context("Failed to build sort thread pool")?;

    let datasets = Coordinator::new(Arc::clone(&config)).ingest().await?;
    distribute_local(config, datasets, num_workers, scheduler).await
}

/// Distribute already ingested datasets to `num_workers` in-process workers
pub async fn distribute_local<S>(
    config: Arc<Config>,
    datasets: BTreeMap<DatasetId, Vec<f64>>,
    num_workers: usize,
    scheduler: S,
) -> Result<DistributionSummary>
where
    S: TaskScheduler + Clone + 'static,
{
    let mut links = Vec::with_capacity(num_workers);
    let mut workers = Vec::with_capacity(num_workers);

    for rank in 1..=num_workers {
        let (coordinator_end, mut worker_end) = tokio::io::duplex(LOCAL_PIPE_CAPACITY);
        let service = NodeService::with_scheduler(rank, &config, scheduler.clone())?;

        workers.push(tokio::spawn(async move { service.serve(&mut worker_end).await }));
        links.push(WorkerLink::new(rank, coordinator_end));
    }

    tracing::info!(workers = num_workers, "local workers started");
    let summary = Coordinator::new(config).distribute(datasets, links).await;

    for (i, worker) in workers.into_iter().enumerate() {
        match worker.await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::debug!(rank = i + 1, error = %e, "local worker failed"),
            Err(e) => tracing::error!(rank = i + 1, error = %e, "local worker task panicked"),
        }
    }

    Ok(summary?)
}
