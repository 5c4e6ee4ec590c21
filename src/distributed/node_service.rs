//! Node service for distributed mode
//!
//! This module implements the worker side of a distributed run. The node
//! service:
//! - Listens for the coordinator's connection (TCP) or is handed a stream
//! - Receives exactly one transfer envelope (COUNT, then PAYLOAD)
//! - Sorts and summarizes the dataset on its own scheduler
//! - Prints the report line and sends the report back
//!
//! Any protocol violation aborts processing of the dataset; the node tries
//! to tell the coordinator with an ERROR frame before giving up.

use super::protocol::*;
use super::{DistributionError, Role};
use crate::config::Config;
use crate::pipeline::crunch;
use crate::sort::{ParallelSorter, RayonScheduler, TaskScheduler};
use crate::stats::{StatsError, StatsOptions};
use anyhow::Context;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;

/// Errors while serving one dataset
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("statistics error: {0}")]
    Stats(#[from] StatsError),

    #[error("sort task failed: {0}")]
    Task(String),
}

/// Node service
///
/// Serves one dataset per session for the coordinator.
pub struct NodeService<S = RayonScheduler> {
    rank: usize,

    /// Node identifier (hostname)
    node_id: String,

    sorter: Arc<ParallelSorter<S>>,
    stats: StatsOptions,
    tag: u32,
    max_frame_bytes: u64,
    precision: usize,
}

impl NodeService<RayonScheduler> {
    /// Create a node service with its own sort thread pool
    pub fn new(rank: usize, config: &Config) -> anyhow::Result<Self> {
        let scheduler = RayonScheduler::new(config.sort.threads)
            .context("Failed to build sort thread pool")?;
        Ok(Self::with_scheduler(rank, config, scheduler)?)
    }
}

impl<S: TaskScheduler + 'static> NodeService<S> {
    /// Create a node service sorting on `scheduler`
    pub fn with_scheduler(rank: usize, config: &Config, scheduler: S) -> Result<Self, DistributionError> {
        let rank = match Role::from_rank(rank) {
            Role::Worker { rank } => rank,
            Role::Coordinator => return Err(DistributionError::InvalidRank(rank)),
        };

        Ok(Self {
            rank,
            node_id: local_node_id(),
            sorter: Arc::new(ParallelSorter::new(scheduler)),
            stats: config.stats,
            tag: config.network.tag,
            max_frame_bytes: config.network.max_frame_bytes,
            precision: config.output.precision,
        })
    }

    /// Listen on `port` and serve the first coordinator that connects
    pub async fn listen(&self, port: u16) -> anyhow::Result<ReportMessage> {
        let addr = format!("0.0.0.0:{}", port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind node service on {}", addr))?;

        tracing::info!(rank = self.rank, node = %self.node_id, port, "waiting for coordinator");
        self.serve_listener(&listener).await
    }

    /// Accept one connection from `listener` and serve it
    pub async fn serve_listener(&self, listener: &TcpListener) -> anyhow::Result<ReportMessage> {
        let (mut stream, peer) = listener
            .accept()
            .await
            .context("Failed to accept connection")?;
        stream.set_nodelay(true).ok();

        tracing::info!(rank = self.rank, %peer, "coordinator connected");
        let report = self.serve(&mut stream).await?;
        Ok(report)
    }

    /// Receive one dataset from `stream`, sort, summarize and report it
    pub async fn serve<T>(&self, stream: &mut T) -> Result<ReportMessage, NodeError>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        let envelope = match TransferEnvelope::receive(stream, self.tag, self.max_frame_bytes).await {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::error!(rank = self.rank, error = %e, "failed to receive dataset");
                self.report_failure(stream, &e.to_string()).await;
                return Err(e.into());
            }
        };

        let dataset = envelope.dataset;
        tracing::info!(rank = self.rank, %dataset, count = envelope.count(), "dataset received");

        let started = Instant::now();
        let sorter = Arc::clone(&self.sorter);
        let options = self.stats;
        let outcome = tokio::task::spawn_blocking(move || {
            let mut values = envelope.values;
            crunch(&mut values, &sorter, &options)
        })
        .await;

        let summary = match outcome {
            Ok(Ok(summary)) => summary,
            Ok(Err(e)) => {
                tracing::error!(rank = self.rank, %dataset, error = %e, "failed to summarize dataset");
                self.report_failure(stream, &e.to_string()).await;
                return Err(e.into());
            }
            Err(e) => {
                tracing::error!(rank = self.rank, %dataset, error = %e, "sort task failed");
                self.report_failure(stream, &e.to_string()).await;
                return Err(NodeError::Task(e.to_string()));
            }
        };

        crate::output::text::print_report(&summary, self.precision);

        let report = ReportMessage {
            node_id: self.node_id.clone(),
            rank: self.rank,
            dataset,
            summary,
            elapsed_ns: started.elapsed().as_nanos() as u64,
        };
        write_message(stream, self.tag, &Message::Report(report.clone())).await?;

        Ok(report)
    }

    /// Send an ERROR frame, ignoring failures (the stream may be gone)
    async fn report_failure<T>(&self, stream: &mut T, error: &str)
    where
        T: AsyncWrite + Unpin,
    {
        let msg = Message::Error(ErrorMessage {
            node_id: self.node_id.clone(),
            rank: self.rank,
            error: error.to_string(),
        });
        if let Err(e) = write_message(stream, self.tag, &msg).await {
            tracing::debug!(rank = self.rank, error = %e, "could not send error to coordinator");
        }
    }
}

/// Node identifier of this host (hostname)
pub fn local_node_id() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}
