//! Parallel in-place quicksort
//!
//! Quicksort over `f64` slices using [`partition`] (last element as pivot).
//! Before each partition the median of the first, middle and last elements
//! is swapped into the last slot, so sorted and reversed input split evenly.
//! The two recursive calls after each partition touch disjoint sub-slices,
//! obtained with `split_at_mut`, and are handed to a [`TaskScheduler`] as a
//! fork-join pair.
//!
//! # Cutoff heuristic
//!
//! After partitioning `[start, end]` at `p`, the left call becomes a *final*
//! task when `p - start < num_threads` and the right call when
//! `end - p < num_threads`. A final task and its whole subtree run inline on
//! the calling thread without further task creation. The threshold follows
//! the scheduler's thread count rather than a fixed constant.
//!
//! When only one side is final, it is sorted inline and the other side is
//! partitioned again in a loop, without a join. Past `2 * log2(len)` levels
//! of joins a subtree is finished sequentially, which keeps the stack of the
//! pool threads bounded.
//!
//! # Example
//!
//! ```
//! use datacrunch::sort::{ParallelSorter, RayonScheduler};
//!
//! let sorter = ParallelSorter::new(RayonScheduler::new(4).unwrap());
//! let mut data = vec![3.0, 1.0, 2.0];
//! sorter.sort(&mut data);
//! assert_eq!(data, vec![1.0, 2.0, 3.0]);
//! ```

pub mod partition;
pub mod scheduler;

pub use partition::partition;
pub use scheduler::{InlineScheduler, RayonScheduler, TaskScheduler};

/// Quicksort driven by an injected task scheduler
#[derive(Debug, Clone)]
pub struct ParallelSorter<S> {
    scheduler: S,
}

impl<S: TaskScheduler> ParallelSorter<S> {
    /// Create a sorter that spawns its tasks on `scheduler`
    pub fn new(scheduler: S) -> Self {
        Self { scheduler }
    }

    /// The scheduler tasks are spawned on
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Sort the whole slice in place, ascending
    ///
    /// Returns only after every spawned task has completed. Empty and
    /// single-element slices are left untouched. Not stable.
    pub fn sort(&self, data: &mut [f64]) {
        if data.len() < 2 {
            return;
        }
        self.scheduler.install(|| self.quicksort(data));
    }

    /// Sort the closed range `[start, end]` in place
    ///
    /// `start >= end` is a no-op.
    ///
    /// # Panics
    ///
    /// Panics if `end` is out of bounds while `start < end`.
    pub fn sort_range(&self, data: &mut [f64], start: usize, end: usize) {
        if start >= end {
            return;
        }
        self.sort(&mut data[start..=end]);
    }

    fn quicksort(&self, data: &mut [f64]) {
        let threads = self.scheduler.num_threads();
        if threads <= 1 {
            sequential_quicksort(data);
            return;
        }
        self.parallel_quicksort(data, threads, depth_limit(data.len()));
    }

    fn parallel_quicksort(&self, mut data: &mut [f64], threads: usize, depth: u32) {
        while data.len() > 1 {
            if depth == 0 {
                sequential_quicksort(data);
                return;
            }

            let (left, right) = split_around_pivot(std::mem::take(&mut data));
            let left_final = left.len() < threads;
            let right_final = right.len() < threads;

            match (left_final, right_final) {
                (true, true) => {
                    sequential_quicksort(left);
                    sequential_quicksort(right);
                    return;
                }
                // Only one side would be a task: run the final one here and
                // keep partitioning the other without a join
                (true, false) => {
                    sequential_quicksort(left);
                    data = right;
                }
                (false, true) => {
                    sequential_quicksort(right);
                    data = left;
                }
                (false, false) => {
                    self.scheduler.join(
                        || self.parallel_quicksort(left, threads, depth - 1),
                        || self.parallel_quicksort(right, threads, depth - 1),
                    );
                    return;
                }
            }
        }
    }
}

/// Fork-join levels allowed before a subtree goes sequential: 2 * log2(len)
fn depth_limit(len: usize) -> u32 {
    2 * (usize::BITS - len.leading_zeros())
}

/// Partition `data` and return the sub-slices left and right of the pivot
///
/// The median of the first, middle and last elements is moved to the end
/// before partitioning. Equal values all land right of the pivot, so when
/// the left side comes out much smaller the run of values equal to the
/// pivot is split off the right side as well.
fn split_around_pivot(data: &mut [f64]) -> (&mut [f64], &mut [f64]) {
    let end = data.len() - 1;
    select_pivot(data);
    let p = partition(data, 0, end);
    let pivot = data[p];

    let (left, rest) = data.split_at_mut(p);
    let right = &mut rest[1..];
    let equal = if left.len() < right.len() / 8 {
        gather_equal(right, pivot)
    } else {
        0
    };
    (left, &mut right[equal..])
}

/// Swap the median of the first, middle and last elements into the last slot
fn select_pivot(data: &mut [f64]) {
    let end = data.len() - 1;
    let mid = end / 2;
    let (a, b, c) = (data[0], data[mid], data[end]);

    let median = if (a <= b) == (b <= c) {
        mid
    } else if (b <= a) == (a <= c) {
        0
    } else {
        end
    };
    data.swap(median, end);
}

/// Move every element equal to `pivot` to the front; returns how many there are
fn gather_equal(data: &mut [f64], pivot: f64) -> usize {
    let mut j = 0;
    for i in 0..data.len() {
        if data[i] == pivot {
            data.swap(i, j);
            j += 1;
        }
    }
    j
}

/// Single-threaded quicksort with the same partitioning scheme
///
/// Recurses into the smaller side and loops on the larger one, so the stack
/// depth stays logarithmic in the slice length.
pub fn sequential_quicksort(mut data: &mut [f64]) {
    while data.len() > 1 {
        let (left, right) = split_around_pivot(std::mem::take(&mut data));

        if left.len() < right.len() {
            sequential_quicksort(left);
            data = right;
        } else {
            sequential_quicksort(right);
            data = left;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Inline scheduler that counts how many joins were requested
    struct CountingScheduler {
        inner: InlineScheduler,
        joins: AtomicUsize,
    }

    impl CountingScheduler {
        fn new(threads: usize) -> Self {
            Self {
                inner: InlineScheduler::with_threads(threads),
                joins: AtomicUsize::new(0),
            }
        }
    }

    impl TaskScheduler for CountingScheduler {
        fn num_threads(&self) -> usize {
            self.inner.num_threads()
        }

        fn join<A, B>(&self, left: A, right: B)
        where
            A: FnOnce() + Send,
            B: FnOnce() + Send,
        {
            self.joins.fetch_add(1, Ordering::SeqCst);
            self.inner.join(left, right);
        }

        fn install<R, F>(&self, op: F) -> R
        where
            F: FnOnce() -> R + Send,
            R: Send,
        {
            self.inner.install(op)
        }
    }

    fn is_sorted(data: &[f64]) -> bool {
        data.windows(2).all(|w| w[0] <= w[1])
    }

    fn sorted_copy(data: &[f64]) -> Vec<f64> {
        let mut copy = data.to_vec();
        copy.sort_by(|a, b| a.partial_cmp(b).unwrap());
        copy
    }

    #[test]
    fn test_sort_empty_and_single() {
        let sorter = ParallelSorter::new(RayonScheduler::new(4).unwrap());

        let mut empty: Vec<f64> = vec![];
        sorter.sort(&mut empty);
        assert!(empty.is_empty());

        let mut single = vec![7.5];
        sorter.sort(&mut single);
        assert_eq!(single, vec![7.5]);
    }

    #[test]
    fn test_sort_range_start_after_end_is_noop() {
        let sorter = ParallelSorter::new(InlineScheduler::new());
        let mut data = vec![3.0, 2.0, 1.0];
        sorter.sort_range(&mut data, 2, 1);
        assert_eq!(data, vec![3.0, 2.0, 1.0]);
        sorter.sort_range(&mut data, 1, 1);
        assert_eq!(data, vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn test_sort_range_sub_range_only() {
        let sorter = ParallelSorter::new(RayonScheduler::new(2).unwrap());
        let mut data = vec![9.0, 5.0, 4.0, 3.0, 2.0, 0.0];
        sorter.sort_range(&mut data, 1, 4);
        assert_eq!(data, vec![9.0, 2.0, 3.0, 4.0, 5.0, 0.0]);
    }

    #[test]
    fn test_sort_with_duplicates() {
        let sorter = ParallelSorter::new(RayonScheduler::new(4).unwrap());
        let mut data = vec![2.0, 1.0, 2.0, 2.0, 0.5, 1.0, 2.0, 3.0, 1.0];
        let expected = sorted_copy(&data);
        sorter.sort(&mut data);
        assert_eq!(data, expected);
    }

    #[test]
    fn test_sort_negative_and_mixed_values() {
        let sorter = ParallelSorter::new(RayonScheduler::new(3).unwrap());
        let mut data = vec![-1.5, 3.25, 0.0, -100.0, 42.0, -0.0, 7.0];
        sorter.sort(&mut data);
        assert!(is_sorted(&data));
        assert_eq!(data[0], -100.0);
        assert_eq!(data[6], 42.0);
    }

    #[test]
    fn test_sort_is_idempotent() {
        let sorter = ParallelSorter::new(RayonScheduler::new(4).unwrap());
        let mut data: Vec<f64> = (0..500).map(|i| ((i * 7919) % 1000) as f64 * 0.5).collect();
        sorter.sort(&mut data);
        let once = data.clone();
        sorter.sort(&mut data);
        assert_eq!(data, once);
    }

    #[test]
    fn test_sort_large_input_with_real_pool() {
        let sorter = ParallelSorter::new(RayonScheduler::new(4).unwrap());
        // Deterministic pseudo-random sequence (LCG), avoids sorted worst case
        let mut state: u64 = 0x2545_F491_4F6C_DD1D;
        let mut data: Vec<f64> = (0..200_000)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                (state >> 11) as f64 / (1u64 << 53) as f64 * 1000.0
            })
            .collect();
        let expected = sorted_copy(&data);
        sorter.sort(&mut data);
        assert_eq!(data, expected);
    }

    #[test]
    fn test_sort_large_sorted_input() {
        let sorter = ParallelSorter::new(RayonScheduler::new(4).unwrap());
        let mut data: Vec<f64> = (0..300_000).map(|i| i as f64).collect();
        let expected = data.clone();
        sorter.sort(&mut data);
        assert_eq!(data, expected);
    }

    #[test]
    fn test_sort_large_reversed_input() {
        let sorter = ParallelSorter::new(RayonScheduler::new(4).unwrap());
        let mut data: Vec<f64> = (0..300_000).rev().map(|i| i as f64).collect();
        sorter.sort(&mut data);
        assert!(is_sorted(&data));
        assert_eq!(data[0], 0.0);
        assert_eq!(data[299_999], 299_999.0);
    }

    #[test]
    fn test_sort_constant_input() {
        let sorter = ParallelSorter::new(RayonScheduler::new(4).unwrap());
        let mut data = vec![2.5; 200_000];
        sorter.sort(&mut data);
        assert!(data.iter().all(|&v| v == 2.5));
        assert_eq!(data.len(), 200_000);
    }

    #[test]
    fn test_sort_few_distinct_values() {
        let sorter = ParallelSorter::new(RayonScheduler::new(4).unwrap());
        let mut data: Vec<f64> = (0..50_000u64).map(|i| ((i * 7919) % 10) as f64).collect();
        let expected = sorted_copy(&data);
        sorter.sort(&mut data);
        assert_eq!(data, expected);
    }

    #[test]
    fn test_sorted_input_joins_stay_shallow() {
        // Inline scheduler runs joins on this thread, so deep nesting would
        // show up as a stack overflow here
        let sorter = ParallelSorter::new(CountingScheduler::new(4));
        let mut data: Vec<f64> = (0..100_000).map(|i| i as f64).collect();
        sorter.sort(&mut data);
        assert!(is_sorted(&data));
        assert!(sorter.scheduler().joins.load(Ordering::SeqCst) > 0);
    }

    #[test]
    fn test_sequential_quicksort_constant_input() {
        let mut data = vec![-1.0; 100_000];
        sequential_quicksort(&mut data);
        assert!(data.iter().all(|&v| v == -1.0));
    }

    #[test]
    fn test_depth_limit_grows_with_log_len() {
        assert_eq!(depth_limit(1), 2);
        assert_eq!(depth_limit(1024), 22);
        assert!(depth_limit(15_000_000) <= 48);
    }

    #[test]
    fn test_single_thread_never_joins() {
        let sorter = ParallelSorter::new(CountingScheduler::new(1));
        let mut data = vec![5.0, 4.0, 3.0, 2.0, 1.0, 0.0];
        sorter.sort(&mut data);
        assert!(is_sorted(&data));
        assert_eq!(sorter.scheduler().joins.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cutoff_below_thread_count_runs_inline() {
        // Both partitions of a 4-element slice are smaller than 8 threads
        let sorter = ParallelSorter::new(CountingScheduler::new(8));
        let mut data = vec![4.0, 1.0, 3.0, 2.0];
        sorter.sort(&mut data);
        assert_eq!(data, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(sorter.scheduler().joins.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cutoff_above_thread_count_spawns_tasks() {
        // Pivot 10.0 splits into [0..5) and [5..10): both >= 2 threads
        let sorter = ParallelSorter::new(CountingScheduler::new(2));
        let mut data = vec![1.0, 19.0, 3.0, 17.0, 5.0, 15.0, 7.0, 13.0, 9.0, 11.0, 10.0];
        sorter.sort(&mut data);
        assert!(is_sorted(&data));
        assert!(sorter.scheduler().joins.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn test_sequential_quicksort_handles_sorted_input() {
        let mut data: Vec<f64> = (0..300_000).map(|i| i as f64).collect();
        let expected = data.clone();
        sequential_quicksort(&mut data);
        assert_eq!(data, expected);
    }

    proptest! {
        #[test]
        fn prop_sort_is_sorted_permutation(data in prop::collection::vec(-1.0e9f64..1.0e9, 0..400)) {
            let sorter = ParallelSorter::new(RayonScheduler::new(4).unwrap());
            let expected = sorted_copy(&data);
            let mut sorted = data.clone();
            sorter.sort(&mut sorted);

            prop_assert!(is_sorted(&sorted));
            prop_assert_eq!(sorted, expected);
        }

        #[test]
        fn prop_inline_and_rayon_agree(
            data in prop::collection::vec(-100.0f64..100.0, 0..300),
            threads in 1usize..16,
        ) {
            let inline = ParallelSorter::new(InlineScheduler::with_threads(threads));
            let pooled = ParallelSorter::new(RayonScheduler::new(threads).unwrap());

            let mut a = data.clone();
            let mut b = data;
            inline.sort(&mut a);
            pooled.sort(&mut b);

            prop_assert_eq!(a, b);
        }
    }
}
