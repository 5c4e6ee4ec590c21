//! Dataset ingestion
//!
//! Datasets are plain text files of whitespace-separated floating-point
//! numbers. A dataset is identified by its expected element count `N` and is
//! read from `<input_dir>/<N>.txt`.
//!
//! Concurrent ingestion collects into a map keyed by [`DatasetId`], so the
//! result does not depend on which file finishes reading first.

use crate::util::time::Stopwatch;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Dataset identifier: the dataset's expected element count
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetId(pub u64);

impl DatasetId {
    /// Path of this dataset inside `input_dir`
    pub fn path_in(&self, input_dir: &Path) -> PathBuf {
        input_dir.join(format!("{}.txt", self.0))
    }

    /// Expected number of values in the dataset
    pub fn expected_len(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ingestion errors
#[derive(Error, Debug)]
pub enum IngestError {
    /// Dataset file could not be opened or read
    #[error("failed to read dataset {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A token is not a floating-point number
    #[error("{path}: token #{index} ({token:?}) is not a number")]
    Parse {
        path: PathBuf,
        index: usize,
        token: String,
    },
}

/// Parse whitespace-separated floats from text
///
/// Returns the index and text of the first token that fails to parse.
/// `capacity` is a hint, capped by how many tokens `text` can hold (each
/// takes at least one byte plus a separator).
pub fn parse_values(text: &str, capacity: usize) -> Result<Vec<f64>, (usize, String)> {
    let mut values = Vec::with_capacity(capacity.min(text.len() / 2 + 1));
    for (index, token) in text.split_ascii_whitespace().enumerate() {
        match token.parse::<f64>() {
            Ok(value) => values.push(value),
            Err(_) => return Err((index, token.to_string())),
        }
    }
    Ok(values)
}

/// Read every value of a dataset file
///
/// `expected_len` only sizes the initial allocation; the returned vector
/// holds exactly the values present in the file.
pub fn read_dataset(path: &Path, expected_len: usize) -> Result<Vec<f64>, IngestError> {
    let text = std::fs::read_to_string(path).map_err(|source| IngestError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    parse_values(&text, expected_len).map_err(|(index, token)| IngestError::Parse {
        path: path.to_path_buf(),
        index,
        token,
    })
}

/// Read one dataset from `input_dir`, timing and logging the read
pub fn ingest(input_dir: &Path, id: DatasetId) -> Result<Vec<f64>, IngestError> {
    let path = id.path_in(input_dir);
    let values = {
        let _timer = Stopwatch::new(format!("Ingest{}", id));
        read_dataset(&path, id.expected_len())?
    };

    if values.len() != id.expected_len() {
        tracing::warn!(
            dataset = %id,
            path = %path.display(),
            expected = id.expected_len(),
            actual = values.len(),
            "dataset size differs from its identifier"
        );
    }

    tracing::debug!(dataset = %id, values = values.len(), "dataset ingested");
    Ok(values)
}

/// Read all datasets concurrently
///
/// Fails on the first dataset that cannot be read. Duplicate identifiers
/// are read once.
pub fn ingest_all(
    input_dir: &Path,
    ids: &[DatasetId],
) -> Result<BTreeMap<DatasetId, Vec<f64>>, IngestError> {
    let _timer = Stopwatch::new("Total Ingestion");

    let mut unique = ids.to_vec();
    unique.sort_unstable();
    unique.dedup();

    unique
        .into_par_iter()
        .map(|id| ingest(input_dir, id).map(|values| (id, values)))
        .collect()
}
