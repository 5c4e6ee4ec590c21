//! Statistics aggregation over a sorted sequence
//!
//! All accumulations run sequentially in index order. The mean is built as
//! `Σ (v / n)` and the geometric mean as `Π v^(1/n)`; both differ in the last
//! bits from `Σv / n` and `(Πv)^(1/n)`, and the per-element root keeps the
//! running product away from overflow on long sequences.
//!
//! # Preconditions
//!
//! The input must be sorted ascending. An unsorted input produces
//! meaningless order statistics but never panics; run [`check_sorted`] first
//! when that matters.
//!
//! The geometric mean assumes strictly positive values. With a zero the
//! result is 0, with negative values it is NaN; [`summarize`] logs a warning
//! in both cases.
//!
//! # Example
//!
//! ```
//! use datacrunch::stats::{summarize, StatsOptions};
//!
//! let report = summarize(&[1.0, 2.0, 3.0, 4.0, 5.0], &StatsOptions::default()).unwrap();
//! assert_eq!(report.size, 5);
//! assert_eq!(report.mean, 3.0);
//! assert_eq!(report.median, 4.0);
//! ```

use super::{median_index, StatsError, StatsOptions, SortCheckScope, SummaryReport, MIN_SUMMARY_LEN};

/// Compute the summary report of a sorted sequence
///
/// Returns [`StatsError::InsufficientData`] for sequences shorter than
/// [`MIN_SUMMARY_LEN`], where the median index would fall out of bounds.
pub fn summarize(sorted: &[f64], options: &StatsOptions) -> Result<SummaryReport, StatsError> {
    let n = sorted.len();
    if n < MIN_SUMMARY_LEN {
        return Err(StatsError::InsufficientData {
            len: n,
            required: MIN_SUMMARY_LEN,
        });
    }

    let (mean, geometric_mean) = mean_and_geometric_mean(sorted);
    let std_dev = population_std_dev(sorted, mean);

    let min = sorted[0];
    let max = sorted[n - 1];

    if min <= 0.0 {
        tracing::warn!(
            size = n,
            min,
            "dataset contains non-positive values, geometric mean is not meaningful"
        );
    }

    Ok(SummaryReport {
        size: n,
        mean,
        std_dev,
        geometric_mean,
        median: sorted[median_index(n)],
        p95: sorted[options.percentile.index(n)],
        min,
        max,
    })
}

/// Arithmetic and geometric mean in one pass
///
/// Returns `(0.0, 1.0)` for an empty slice.
pub fn mean_and_geometric_mean(data: &[f64]) -> (f64, f64) {
    let n = data.len() as f64;
    let root = 1.0 / n;

    data.iter().fold((0.0, 1.0), |(avg, prod), &value| {
        (avg + value / n, prod * value.powf(root))
    })
}

/// Population standard deviation (divides by `n`, no Bessel correction)
pub fn population_std_dev(data: &[f64], mean: f64) -> f64 {
    let sum_sq: f64 = data.iter().map(|&v| (v - mean) * (v - mean)).sum();
    (sum_sq / data.len() as f64).sqrt()
}

/// Find the first descending adjacent pair
///
/// Returns `Some(i)` when `data[i] > data[i + 1]`, scanning only as far as
/// `scope` allows. `None` means no violation was found in scope.
pub fn check_sorted(data: &[f64], scope: SortCheckScope) -> Option<usize> {
    let pairs = data.len().saturating_sub(1);
    let limit = match scope {
        SortCheckScope::Full => pairs,
        SortCheckScope::Prefix(n) => n.min(pairs),
    };

    (0..limit).find(|&i| data[i] > data[i + 1])
}
