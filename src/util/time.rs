//! Timing utilities
//!
//! [`Stopwatch`] is a scoped timer: it logs the elapsed wall-clock time of
//! the scope it lives in when it is dropped. It only observes; nothing in
//! the sort or statistics path depends on it.

use std::time::{Duration, Instant};

/// Scoped wall-clock timer
///
/// # Example
///
/// ```
/// use datacrunch::util::time::Stopwatch;
///
/// {
///     let _timer = Stopwatch::new("Total Manipulation");
///     // ... timed work ...
/// } // "Total Manipulation - Time elapsed: ... seconds" is logged here
/// ```
#[derive(Debug)]
pub struct Stopwatch {
    name: String,
    start: Instant,
}

impl Stopwatch {
    /// Start a named stopwatch
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: Instant::now(),
        }
    }

    /// Time since the stopwatch was started
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Stopwatch {
    fn drop(&mut self) {
        let elapsed = self.elapsed();
        tracing::info!(
            timer = %self.name,
            elapsed_us = elapsed.as_micros() as u64,
            "{} - Time elapsed: {:.6} seconds.",
            self.name,
            elapsed.as_secs_f64()
        );
    }
}

/// Values processed per second
pub fn calculate_rate(values: usize, duration: Duration) -> f64 {
    let seconds = duration.as_secs_f64();
    if seconds > 0.0 {
        values as f64 / seconds
    } else {
        0.0
    }
}
