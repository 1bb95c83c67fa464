//! Screening statistics
//!
//! Counts requests and every degraded path so fallbacks stay observable.
//! Exposed through `GET /health`.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Live counters shared by all requests
#[derive(Debug)]
pub struct ScreeningStats {
    started: Instant,
    requests: AtomicU64,
    batch_failures: AtomicU64,
    history_failures: AtomicU64,
    counter_fallbacks: AtomicU64,
    pipeline_failures: AtomicU64,
    /// Milliseconds after `started` of the latest degraded path, plus one (0 = never)
    last_degraded_ms: AtomicU64,
}

impl Default for ScreeningStats {
    fn default() -> Self {
        Self {
            started: Instant::now(),
            requests: AtomicU64::new(0),
            batch_failures: AtomicU64::new(0),
            history_failures: AtomicU64::new(0),
            counter_fallbacks: AtomicU64::new(0),
            pipeline_failures: AtomicU64::new(0),
            last_degraded_ms: AtomicU64::new(0),
        }
    }
}

/// Point-in-time copy of `ScreeningStats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Cross-duplicate checks started
    pub requests: u64,
    /// Worker batches that failed and were treated as "no matches"
    pub batch_failures: u64,
    /// History fetches that failed and were treated as "no history"
    pub history_failures: u64,
    /// Group ids issued at random because the counter failed
    pub counter_fallbacks: u64,
    /// Whole pipelines that failed and fell back for every question
    pub pipeline_failures: u64,
}

impl ScreeningStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batch_failure(&self) {
        self.batch_failures.fetch_add(1, Ordering::Relaxed);
        self.mark_degraded();
    }

    pub fn record_history_failure(&self) {
        self.history_failures.fetch_add(1, Ordering::Relaxed);
        self.mark_degraded();
    }

    pub fn record_counter_fallback(&self) {
        self.counter_fallbacks.fetch_add(1, Ordering::Relaxed);
        self.mark_degraded();
    }

    pub fn record_pipeline_failure(&self) {
        self.pipeline_failures.fetch_add(1, Ordering::Relaxed);
        self.mark_degraded();
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            batch_failures: self.batch_failures.load(Ordering::Relaxed),
            history_failures: self.history_failures.load(Ordering::Relaxed),
            counter_fallbacks: self.counter_fallbacks.load(Ordering::Relaxed),
            pipeline_failures: self.pipeline_failures.load(Ordering::Relaxed),
        }
    }

    fn mark_degraded(&self) {
        let elapsed = self.started.elapsed().as_millis() as u64;
        self.last_degraded_ms.fetch_max(elapsed + 1, Ordering::Relaxed);
    }

    /// Time since the latest degraded path, if any was ever taken
    pub fn since_last_degraded(&self) -> Option<Duration> {
        match self.last_degraded_ms.load(Ordering::Relaxed) {
            0 => None,
            marked => {
                let at = Duration::from_millis(marked - 1);
                Some(self.started.elapsed().saturating_sub(at))
            }
        }
    }

    /// Whether a degraded path was taken within the last `window`
    ///
    /// Counters keep the full history; this only reflects recent activity.
    pub fn is_degraded_within(&self, window: Duration) -> bool {
        self.since_last_degraded().is_some_and(|since| since < window)
    }
}
