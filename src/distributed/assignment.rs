//! Dataset-to-worker assignment
//!
//! Workers are taken in ascending rank order and datasets in configured
//! order; the i-th worker gets the i-th dataset. The mapping is computed up
//! front and validated, so the coordinator never indexes past the datasets
//! it holds.

use super::{DistributionError, COORDINATOR_RANK};
use crate::ingest::DatasetId;
use std::collections::HashSet;

/// Validated 1:1 mapping from worker rank to dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pairs: Vec<(usize, DatasetId)>,
    unassigned: Vec<DatasetId>,
}

impl Assignment {
    /// Plan the assignment
    ///
    /// Fails if there are no workers, a rank is 0 or repeated, a dataset is
    /// repeated, or there are fewer datasets than workers. Datasets beyond
    /// the worker count are kept as unassigned.
    ///
    /// # Examples
    ///
    /// ```
    /// use datacrunch::distributed::Assignment;
    /// use datacrunch::ingest::DatasetId;
    ///
    /// let plan = Assignment::plan(&[DatasetId(10), DatasetId(20), DatasetId(30)], &[2, 1]).unwrap();
    /// assert_eq!(plan.pairs(), &[(1, DatasetId(10)), (2, DatasetId(20))]);
    /// assert_eq!(plan.unassigned(), &[DatasetId(30)]);
    /// ```
    pub fn plan(datasets: &[DatasetId], ranks: &[usize]) -> Result<Self, DistributionError> {
        if ranks.is_empty() {
            return Err(DistributionError::NoWorkers);
        }

        let mut sorted_ranks = ranks.to_vec();
        sorted_ranks.sort_unstable();
        for window in sorted_ranks.windows(2) {
            if window[0] == window[1] {
                return Err(DistributionError::DuplicateRank(window[0]));
            }
        }
        if sorted_ranks[0] == COORDINATOR_RANK {
            return Err(DistributionError::InvalidRank(COORDINATOR_RANK));
        }

        let mut seen = HashSet::with_capacity(datasets.len());
        for &dataset in datasets {
            if !seen.insert(dataset) {
                return Err(DistributionError::DuplicateDataset(dataset));
            }
        }

        if datasets.len() < sorted_ranks.len() {
            return Err(DistributionError::NotEnoughDatasets {
                datasets: datasets.len(),
                workers: sorted_ranks.len(),
            });
        }

        let pairs = sorted_ranks
            .iter()
            .copied()
            .zip(datasets.iter().copied())
            .collect();
        let unassigned = datasets[sorted_ranks.len()..].to_vec();

        Ok(Self { pairs, unassigned })
    }

    /// (rank, dataset) pairs in ascending rank order
    pub fn pairs(&self) -> &[(usize, DatasetId)] {
        &self.pairs
    }

    /// Datasets left over because there are more datasets than workers
    pub fn unassigned(&self) -> &[DatasetId] {
        &self.unassigned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(sizes: &[u64]) -> Vec<DatasetId> {
        sizes.iter().copied().map(DatasetId).collect()
    }

    #[test]
    fn test_one_dataset_per_worker() {
        let plan = Assignment::plan(&ids(&[5, 7, 9]), &[1, 2, 3]).unwrap();
        assert_eq!(plan.pairs(), &[(1, DatasetId(5)), (2, DatasetId(7)), (3, DatasetId(9))]);
        assert!(plan.unassigned().is_empty());
    }

    #[test]
    fn test_assignment_ignores_rank_order() {
        let a = Assignment::plan(&ids(&[5, 7]), &[2, 1]).unwrap();
        let b = Assignment::plan(&ids(&[5, 7]), &[1, 2]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_not_enough_datasets() {
        let err = Assignment::plan(&ids(&[5]), &[1, 2]).unwrap_err();
        assert_eq!(
            err,
            DistributionError::NotEnoughDatasets {
                datasets: 1,
                workers: 2
            }
        );
    }

    #[test]
    fn test_no_workers() {
        assert_eq!(
            Assignment::plan(&ids(&[5]), &[]).unwrap_err(),
            DistributionError::NoWorkers
        );
    }

    #[test]
    fn test_invalid_and_duplicate_ranks() {
        assert_eq!(
            Assignment::plan(&ids(&[5, 7]), &[0, 1]).unwrap_err(),
            DistributionError::InvalidRank(0)
        );
        assert_eq!(
            Assignment::plan(&ids(&[5, 7]), &[1, 1]).unwrap_err(),
            DistributionError::DuplicateRank(1)
        );
    }

    #[test]
    fn test_duplicate_dataset() {
        assert_eq!(
            Assignment::plan(&ids(&[5, 5]), &[1, 2]).unwrap_err(),
            DistributionError::DuplicateDataset(DatasetId(5))
        );
    }
}
