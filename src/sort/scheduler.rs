//! Task schedulers for the parallel sorter
//!
//! The sorter never reaches for a global thread pool. It is handed a
//! [`TaskScheduler`] that owns (or stands in for) the worker threads, so the
//! thread count that drives the cutoff heuristic is explicit and a test can
//! swap in a deterministic single-threaded scheduler.
//!
//! - [`RayonScheduler`]: dedicated rayon thread pool, fork-join via `join`
//! - [`InlineScheduler`]: runs both halves of every join on the calling thread

use std::sync::Arc;

/// Fork-join task scheduler
///
/// `join` must not return before both closures have completed. This is the
/// barrier the sorter relies on before it treats a range as sorted.
pub trait TaskScheduler: Send + Sync {
    /// Number of worker threads tasks may run on
    fn num_threads(&self) -> usize;

    /// Run `left` and `right`, potentially in parallel, and wait for both
    fn join<A, B>(&self, left: A, right: B)
    where
        A: FnOnce() + Send,
        B: FnOnce() + Send;

    /// Run `op` in the scheduler's context and return its result
    fn install<R, F>(&self, op: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send;
}

/// Stack size of sort threads
///
/// Recursion depth on the parallel path grows with the number of
/// unbalanced partitions (already sorted input with a last-element pivot).
pub const SORT_THREAD_STACK_SIZE: usize = 32 << 20;

/// Scheduler backed by a dedicated rayon thread pool
///
/// Cloning is cheap; clones share the same pool.
#[derive(Clone)]
pub struct RayonScheduler {
    pool: Arc<rayon::ThreadPool>,
}

impl RayonScheduler {
    /// Build a pool with `threads` workers (0 = one per CPU core)
    pub fn new(threads: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let threads = if threads == 0 { num_cpus::get() } else { threads };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("sort-{}", i))
            .stack_size(SORT_THREAD_STACK_SIZE)
            .build()?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

impl std::fmt::Debug for RayonScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RayonScheduler")
            .field("num_threads", &self.pool.current_num_threads())
            .finish()
    }
}

impl TaskScheduler for RayonScheduler {
    fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    fn join<A, B>(&self, left: A, right: B)
    where
        A: FnOnce() + Send,
        B: FnOnce() + Send,
    {
        // Called from inside the pool this is a plain rayon::join
        self.pool.join(left, right);
    }

    fn install<R, F>(&self, op: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }
}

/// Deterministic scheduler that runs everything on the calling thread
///
/// `left` always completes before `right` starts. The reported thread count
/// only feeds the cutoff heuristic, which lets tests drive the parallel
/// decomposition path without any real concurrency.
#[derive(Debug, Clone, Copy)]
pub struct InlineScheduler {
    reported_threads: usize,
}

impl InlineScheduler {
    /// Inline scheduler reporting a single thread
    pub fn new() -> Self {
        Self { reported_threads: 1 }
    }

    /// Inline scheduler that reports `threads` to the cutoff heuristic
    pub fn with_threads(threads: usize) -> Self {
        Self {
            reported_threads: threads.max(1),
        }
    }
}

impl Default for InlineScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskScheduler for InlineScheduler {
    fn num_threads(&self) -> usize {
        self.reported_threads
    }

    fn join<A, B>(&self, left: A, right: B)
    where
        A: FnOnce() + Send,
        B: FnOnce() + Send,
    {
        left();
        right();
    }

    fn install<R, F>(&self, op: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        op()
    }
}

/// Warn if the configured sort threads exceed the CPU count
///
/// Returns true when oversubscribed.
pub fn warn_if_oversubscribed(threads: usize) -> bool {
    let cpu_count = num_cpus::get();
    if threads > cpu_count {
        tracing::warn!(
            threads,
            cpu_count,
            "sort thread count exceeds CPU count, expect context switching overhead"
        );
        true
    } else {
        false
    }
}
