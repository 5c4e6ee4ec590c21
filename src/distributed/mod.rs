//! Distributed mode implementation
//!
//! One coordinator hands one dataset to each worker process, each worker
//! sorts and summarizes its dataset and reports back.
//!
//! # Architecture
//!
//! - **Coordinator** (rank 0): ingests all datasets, assigns one per worker,
//!   sends it as a transfer envelope and collects the reports
//! - **Node Service** (rank >= 1): receives one envelope, runs the sort and
//!   summary pipeline, prints and returns the report
//!
//! Both sides talk over any `AsyncRead + AsyncWrite` stream: TCP between
//! processes, or in-memory pipes in local mode.
//!
//! # Modules
//!
//! - `protocol`: Message definitions, framing and transfer envelopes
//! - `assignment`: Dataset-to-worker mapping
//! - `node_service`: Worker side
//! - `coordinator`: Coordinator side
//! - `local`: Coordinator and workers in one process

pub mod assignment;
pub mod coordinator;
pub mod local;
pub mod node_service;
pub mod protocol;

use crate::ingest::DatasetId;
use thiserror::Error;

// Re-export key types
pub use assignment::Assignment;
pub use coordinator::{Coordinator, DistributionSummary, WorkerLink, WorkerOutcome};
pub use node_service::{NodeError, NodeService};
pub use protocol::{
    CountMessage, ErrorMessage, Message, PayloadMessage, ProtocolError, ReportMessage,
    TransferEnvelope, PROTOCOL_VERSION,
};

/// Rank of the coordinator process
pub const COORDINATOR_RANK: usize = 0;

/// Role of a process in a distributed run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Coordinator,
    Worker { rank: usize },
}

impl Role {
    /// Role for a rank: rank 0 coordinates, everyone else works
    pub fn from_rank(rank: usize) -> Self {
        if rank == COORDINATOR_RANK {
            Role::Coordinator
        } else {
            Role::Worker { rank }
        }
    }
}

/// Errors planning or running a distribution
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DistributionError {
    #[error("no workers to distribute to")]
    NoWorkers,

    #[error("rank {0} is reserved for the coordinator")]
    InvalidRank(usize),

    #[error("worker rank {0} appears more than once")]
    DuplicateRank(usize),

    #[error("dataset {0} appears more than once")]
    DuplicateDataset(DatasetId),

    #[error("{datasets} dataset(s) for {workers} worker(s): every worker needs its own dataset")]
    NotEnoughDatasets { datasets: usize, workers: usize },

    #[error("dataset {0} was assigned but not ingested")]
    MissingDataset(DatasetId),
}
