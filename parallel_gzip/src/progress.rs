//! Progress reporting hook.
//!
//! The writer reports source bytes covered by the output written so far. Any
//! `Fn(u64, u64)` closure works as a reporter:
//!
//! ```
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! use parallel_gzip::Progress;
//!
//! let seen = AtomicU64::new(0);
//! let report = |processed: u64, _total: u64| seen.store(processed, Ordering::Relaxed);
//! report.update(42, 100);
//! assert_eq!(seen.load(Ordering::Relaxed), 42);
//! ```

use std::time::{Duration, Instant};

/// Receives `(processed, total)` source-byte counts from the writer.
///
/// Implementations own their display and may drop updates freely; the
/// pipeline never depends on what they do.
pub trait Progress: Send + Sync {
    fn update(&self, processed: u64, total: u64);
}

/// Discards all updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn update(&self, _processed: u64, _total: u64) {}
}

impl<F> Progress for F
where
    F: Fn(u64, u64) + Send + Sync,
{
    fn update(&self, processed: u64, total: u64) {
        self(processed, total)
    }
}

/// Rate limiter for progress reports.
pub(crate) struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// True if enough time has passed since the last accepted report.
    pub(crate) fn ready(&mut self) -> bool {
        let now = Instant::now();
        match self.last {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttle_drops_rapid_reports() {
        let mut throttle = Throttle::new(Duration::from_secs(60));
        assert!(throttle.ready());
        assert!(!throttle.ready());
        assert!(!throttle.ready());
    }

    #[test]
    fn zero_interval_accepts_everything() {
        let mut throttle = Throttle::new(Duration::ZERO);
        assert!((0..5).all(|_| throttle.ready()));
    }
}
