//! Distributed coordinator
//!
//! This module implements the coordinator for distributed mode.
//! The coordinator:
//! - Ingests every configured dataset concurrently
//! - Assigns one dataset to each worker (validated, in rank order)
//! - Sends each worker its dataset as COUNT then PAYLOAD
//! - Collects one REPORT or ERROR back from each worker
//!
//! A failure on one worker's stream is recorded for that worker; the other
//! workers still get their datasets.

use super::assignment::Assignment;
use super::protocol::*;
use super::DistributionError;
use crate::config::Config;
use crate::ingest::{ingest_all, DatasetId};
use crate::util::time::Stopwatch;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Connection to one worker
#[derive(Debug)]
pub struct WorkerLink<T> {
    pub rank: usize,
    pub stream: T,
}

impl<T> WorkerLink<T> {
    pub fn new(rank: usize, stream: T) -> Self {
        Self { rank, stream }
    }
}

/// What became of one worker's dataset
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerOutcome {
    Completed(ReportMessage),
    Failed {
        rank: usize,
        dataset: DatasetId,
        error: String,
    },
}

impl WorkerOutcome {
    pub fn rank(&self) -> usize {
        match self {
            WorkerOutcome::Completed(report) => report.rank,
            WorkerOutcome::Failed { rank, .. } => *rank,
        }
    }
}

/// Result of one distribution round
#[derive(Debug, Clone)]
pub struct DistributionSummary {
    pub assignment: Assignment,

    /// One outcome per worker, in rank order
    pub outcomes: Vec<WorkerOutcome>,
}

impl DistributionSummary {
    /// Reports of the workers that completed
    pub fn reports(&self) -> impl Iterator<Item = &ReportMessage> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            WorkerOutcome::Completed(report) => Some(report),
            WorkerOutcome::Failed { .. } => None,
        })
    }

    /// Number of workers that failed
    pub fn failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, WorkerOutcome::Failed { .. }))
            .count()
    }

    pub fn is_success(&self) -> bool {
        self.failures() == 0
    }
}

/// Distributed coordinator
///
/// Hands one dataset to each worker and gathers the reports.
pub struct Coordinator {
    config: Arc<Config>,
}

impl Coordinator {
    /// Create a new coordinator
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Ingest every configured dataset (on the blocking pool)
    pub async fn ingest(&self) -> Result<BTreeMap<DatasetId, Vec<f64>>> {
        let input_dir = self.config.datasets.input_dir.clone();
        let ids = self.config.datasets.ids();

        let datasets = tokio::task::spawn_blocking(move || ingest_all(&input_dir, &ids))
            .await
            .context("Ingestion task failed")??;

        Ok(datasets)
    }

    /// Ingest, then distribute to `links`
    pub async fn run<T>(&self, links: Vec<WorkerLink<T>>) -> Result<DistributionSummary>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        let datasets = self.ingest().await?;
        let summary = self.distribute(datasets, links).await?;
        Ok(summary)
    }

    /// Send one dataset to each worker and collect the replies
    ///
    /// Datasets are assigned in configured order to workers in ascending
    /// rank order. Each dataset is moved out of `datasets` as it is sent.
    pub async fn distribute<T>(
        &self,
        mut datasets: BTreeMap<DatasetId, Vec<f64>>,
        mut links: Vec<WorkerLink<T>>,
    ) -> Result<DistributionSummary, DistributionError>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        let _timer = Stopwatch::new("Total Manipulation");

        let ranks: Vec<usize> = links.iter().map(|link| link.rank).collect();
        let assignment = Assignment::plan(&self.config.datasets.ids(), &ranks)?;

        for dataset in assignment.unassigned() {
            tracing::warn!(%dataset, "more datasets than workers, dataset not distributed");
        }
        for &(_, dataset) in assignment.pairs() {
            if !datasets.contains_key(&dataset) {
                return Err(DistributionError::MissingDataset(dataset));
            }
        }

        links.sort_by_key(|link| link.rank);
        let tag = self.config.network.tag;

        // Send phase: failures are recorded per worker
        let mut outcomes: Vec<Option<WorkerOutcome>> = Vec::with_capacity(links.len());
        for (link, &(rank, dataset)) in links.iter_mut().zip(assignment.pairs()) {
            let values = datasets.remove(&dataset).unwrap_or_default();
            let envelope = TransferEnvelope::new(dataset, values);

            tracing::info!(rank, %dataset, count = envelope.count(), "sending dataset");
            match envelope.send(&mut link.stream, tag).await {
                Ok(()) => outcomes.push(None),
                Err(e) => {
                    tracing::error!(rank, %dataset, error = %e, "failed to send dataset");
                    outcomes.push(Some(WorkerOutcome::Failed {
                        rank,
                        dataset,
                        error: e.to_string(),
                    }));
                }
            }
        }

        // Collect phase
        let max_frame_bytes = self.config.network.max_frame_bytes;
        for ((link, &(rank, dataset)), outcome) in links
            .iter_mut()
            .zip(assignment.pairs())
            .zip(outcomes.iter_mut())
        {
            if outcome.is_some() {
                continue;
            }
            *outcome = Some(collect_reply(&mut link.stream, rank, dataset, tag, max_frame_bytes).await);
        }

        Ok(DistributionSummary {
            assignment,
            outcomes: outcomes.into_iter().flatten().collect(),
        })
    }
}

/// Wait for one worker's REPORT or ERROR
async fn collect_reply<T>(
    stream: &mut T,
    rank: usize,
    dataset: DatasetId,
    tag: u32,
    max_frame_bytes: u64,
) -> WorkerOutcome
where
    T: AsyncRead + Unpin,
{
    let failed = |error: String| WorkerOutcome::Failed { rank, dataset, error };

    match expect_message(stream, tag, max_frame_bytes).await {
        Ok(Message::Report(report)) => {
            if report.rank != rank || report.dataset != dataset {
                tracing::warn!(
                    rank,
                    %dataset,
                    reported_rank = report.rank,
                    reported_dataset = %report.dataset,
                    "report does not match assignment"
                );
            }
            tracing::info!(
                rank,
                %dataset,
                node = %report.node_id,
                elapsed_ms = report.elapsed_ns / 1_000_000,
                "report received"
            );
            WorkerOutcome::Completed(report)
        }
        Ok(Message::Error(error)) => {
            tracing::error!(rank, %dataset, node = %error.node_id, error = %error.error, "worker failed");
            failed(error.error)
        }
        Ok(other) => {
            let e = ProtocolError::UnexpectedMessage {
                expected: "REPORT",
                actual: other.kind(),
            };
            tracing::error!(rank, %dataset, error = %e, "unexpected reply");
            failed(e.to_string())
        }
        Err(e) => {
            tracing::error!(rank, %dataset, error = %e, "failed to read reply");
            failed(e.to_string())
        }
    }
}

/// Connect to each worker address; the i-th address gets rank i+1
pub async fn connect_workers(addresses: &[String]) -> Result<Vec<WorkerLink<TcpStream>>> {
    let mut links = Vec::with_capacity(addresses.len());

    for (i, addr) in addresses.iter().enumerate() {
        let rank = i + 1;
        tracing::info!(rank, %addr, "connecting to worker");

        let stream = TcpStream::connect(addr)
            .await
            .with_context(|| format!("Failed to connect to worker {} ({})", rank, addr))?;
        stream.set_nodelay(true).ok();

        links.push(WorkerLink::new(rank, stream));
    }

    tracing::info!(workers = links.len(), "all workers connected");
    Ok(links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::SummaryReport;
    use tokio::io::DuplexStream;

    fn config_with_sizes(sizes: &[u64]) -> Arc<Config> {
        let mut config = Config::default();
        config.datasets.sizes = sizes.to_vec();
        Arc::new(config)
    }

    fn dataset(size: u64) -> Vec<f64> {
        (0..size).map(|i| (size - i) as f64).collect()
    }

    /// Worker stand-in: receive the envelope, reply with a fake report
    async fn echo_worker(mut stream: DuplexStream, rank: usize) -> TransferEnvelope {
        let envelope = TransferEnvelope::receive(&mut stream, DEFAULT_TAG, DEFAULT_MAX_FRAME_BYTES)
            .await
            .unwrap();
        let report = ReportMessage {
            node_id: "test".to_string(),
            rank,
            dataset: envelope.dataset,
            summary: SummaryReport {
                size: envelope.values.len(),
                mean: 0.0,
                std_dev: 0.0,
                geometric_mean: 0.0,
                median: 0.0,
                p95: 0.0,
                min: 0.0,
                max: 0.0,
            },
            elapsed_ns: 0,
        };
        write_message(&mut stream, DEFAULT_TAG, &Message::Report(report))
            .await
            .unwrap();
        envelope
    }

    #[tokio::test]
    async fn test_each_worker_gets_its_own_dataset() {
        let sizes = [10u64, 20, 30];
        let config = config_with_sizes(&sizes);
        let datasets: BTreeMap<_, _> = sizes.iter().map(|&s| (DatasetId(s), dataset(s))).collect();

        let mut links = Vec::new();
        let mut workers = Vec::new();
        for rank in 1..=3 {
            let (coordinator_end, worker_end) = tokio::io::duplex(4096);
            links.push(WorkerLink::new(rank, coordinator_end));
            workers.push(tokio::spawn(echo_worker(worker_end, rank)));
        }

        let summary = Coordinator::new(config)
            .distribute(datasets, links)
            .await
            .unwrap();
        assert!(summary.is_success());
        assert_eq!(summary.reports().count(), 3);

        for (worker, &size) in workers.into_iter().zip(sizes.iter()) {
            let received = worker.await.unwrap();
            assert_eq!(received.dataset, DatasetId(size));
            assert_eq!(received.count(), size);
            assert_eq!(received.values, dataset(size));
        }
    }

    #[tokio::test]
    async fn test_not_enough_datasets() {
        let config = config_with_sizes(&[10]);
        let datasets: BTreeMap<_, _> = [(DatasetId(10), dataset(10))].into_iter().collect();

        let (a, _a_worker) = tokio::io::duplex(1024);
        let (b, _b_worker) = tokio::io::duplex(1024);
        let links = vec![WorkerLink::new(1, a), WorkerLink::new(2, b)];

        let err = Coordinator::new(config)
            .distribute(datasets, links)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            DistributionError::NotEnoughDatasets {
                datasets: 1,
                workers: 2
            }
        );
    }

    #[tokio::test]
    async fn test_missing_dataset() {
        let config = config_with_sizes(&[10, 20]);
        let datasets: BTreeMap<_, _> = [(DatasetId(10), dataset(10))].into_iter().collect();

        let (a, _a_worker) = tokio::io::duplex(1024);
        let (b, _b_worker) = tokio::io::duplex(1024);
        let links = vec![WorkerLink::new(1, a), WorkerLink::new(2, b)];

        let err = Coordinator::new(config)
            .distribute(datasets, links)
            .await
            .unwrap_err();
        assert_eq!(err, DistributionError::MissingDataset(DatasetId(20)));
    }

    #[tokio::test]
    async fn test_worker_error_is_recorded() {
        let config = config_with_sizes(&[10, 20]);
        let datasets: BTreeMap<_, _> = [10u64, 20]
            .iter()
            .map(|&s| (DatasetId(s), dataset(s)))
            .collect();

        let (good, good_worker) = tokio::io::duplex(4096);
        let (bad, mut bad_worker) = tokio::io::duplex(4096);
        let links = vec![WorkerLink::new(2, bad), WorkerLink::new(1, good)];

        let good_task = tokio::spawn(echo_worker(good_worker, 1));
        let bad_task = tokio::spawn(async move {
            TransferEnvelope::receive(&mut bad_worker, DEFAULT_TAG, DEFAULT_MAX_FRAME_BYTES)
                .await
                .unwrap();
            let error = Message::Error(ErrorMessage {
                node_id: "bad".to_string(),
                rank: 2,
                error: "disk on fire".to_string(),
            });
            write_message(&mut bad_worker, DEFAULT_TAG, &error).await.unwrap();
        });

        let summary = Coordinator::new(config)
            .distribute(datasets, links)
            .await
            .unwrap();
        good_task.await.unwrap();
        bad_task.await.unwrap();

        assert!(!summary.is_success());
        assert_eq!(summary.failures(), 1);
        assert_eq!(summary.outcomes[0].rank(), 1);
        assert_eq!(
            summary.outcomes[1],
            WorkerOutcome::Failed {
                rank: 2,
                dataset: DatasetId(20),
                error: "disk on fire".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_closed_worker_is_recorded() {
        let config = config_with_sizes(&[10]);
        let datasets: BTreeMap<_, _> = [(DatasetId(10), dataset(10))].into_iter().collect();

        let (a, a_worker) = tokio::io::duplex(4096);
        drop(a_worker);

        let summary = Coordinator::new(config)
            .distribute(datasets, vec![WorkerLink::new(1, a)])
            .await
            .unwrap();
        assert_eq!(summary.failures(), 1);
    }

    #[tokio::test]
    async fn test_connect_workers_assigns_ranks() {
        let first = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let second = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addresses = vec![
            first.local_addr().unwrap().to_string(),
            second.local_addr().unwrap().to_string(),
        ];

        let links = connect_workers(&addresses).await.unwrap();
        assert_eq!(links.iter().map(|l| l.rank).collect::<Vec<_>>(), vec![1, 2]);
    }
}
