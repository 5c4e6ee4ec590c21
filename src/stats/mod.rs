//! Summary statistics over sorted datasets
//!
//! This module defines the immutable [`SummaryReport`] produced once per
//! dataset after sorting, the options that control how it is computed, and
//! the error returned when a dataset is too small to summarize.
//!
//! The computation itself lives in [`aggregator`].
//!
//! # Report fields
//!
//! | Field            | Definition                                   |
//! |------------------|----------------------------------------------|
//! | `size`           | number of elements                           |
//! | `mean`           | `Σ (v / n)`, accumulated in index order      |
//! | `std_dev`        | population standard deviation                |
//! | `geometric_mean` | `Π v^(1/n)`, accumulated in index order      |
//! | `median`         | element at index `n/2 + 1`                   |
//! | `p95`            | see [`PercentileMode`]                       |
//! | `min` / `max`    | first / last element                         |

pub mod aggregator;

pub use aggregator::{check_sorted, mean_and_geometric_mean, summarize};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest dataset for which every report index is in bounds
///
/// The median index `n/2 + 1` only falls inside the data for `n >= 3`.
pub const MIN_SUMMARY_LEN: usize = 3;

/// Summary of one sorted dataset
///
/// Field order matches the report line: size, mean, standard deviation,
/// geometric mean, median, 95th percentile, minimum, maximum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub size: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub geometric_mean: f64,
    pub median: f64,
    pub p95: f64,
    pub min: f64,
    pub max: f64,
}

/// How the 95th percentile index is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PercentileMode {
    /// Index `floor(0.95 * (n - 1))`
    #[default]
    Nearest,
    /// Index `(95 / 100) * n` under integer division, which is always 0.
    /// Kept for output parity with the historical reports.
    Legacy,
}

impl PercentileMode {
    /// Index of the 95th percentile element in a sorted sequence of `n` elements
    pub fn index(self, n: usize) -> usize {
        match self {
            PercentileMode::Nearest => {
                if n == 0 {
                    0
                } else {
                    (0.95 * (n - 1) as f64).floor() as usize
                }
            }
            #[allow(clippy::erasing_op)]
            PercentileMode::Legacy => (95 / 100) * n,
        }
    }
}

/// How much of a sequence the sortedness check scans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortCheckScope {
    /// Every adjacent pair
    #[default]
    Full,
    /// Only the pairs starting within the first `n` elements
    Prefix(usize),
}

/// Options for [`summarize`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatsOptions {
    #[serde(default)]
    pub percentile: PercentileMode,
    #[serde(default)]
    pub sort_check: SortCheckScope,
}

/// Errors from the statistics aggregator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatsError {
    /// Dataset too small for the report's index formulas
    #[error("dataset has {len} elements, at least {required} are needed for a summary")]
    InsufficientData { len: usize, required: usize },
}

/// Index of the median element in a sorted sequence of `n` elements
///
/// Deliberately `n/2 + 1`, one past the textbook middle element, to stay
/// comparable with previously published reports.
#[inline]
pub fn median_index(n: usize) -> usize {
    n / 2 + 1
}
