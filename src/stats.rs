// src/stats.rs
// =============================================================================
// Process-lifetime counters for the pipeline.
//
// A run that exhausts its retries sends nothing and raises no error, so
// without these counters it would leave no trace beyond a log line. They are
// summarized in the log after every run.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct RunStats {
    runs_started: AtomicU64,
    runs_notified: AtomicU64,
    runs_exhausted: AtomicU64,
    failed_attempts: AtomicU64,
    records_skipped: AtomicU64,
}

/// Plain copy of the counters at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub runs_started: u64,
    pub runs_notified: u64,
    pub runs_exhausted: u64,
    pub failed_attempts: u64,
    pub records_skipped: u64,
}

impl RunStats {
    pub fn record_run_started(&self) {
        self.runs_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_notified(&self) {
        self.runs_notified.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_exhausted(&self) {
        self.runs_exhausted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed_attempt(&self) {
        self.failed_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self, count: usize) {
        self.records_skipped.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            runs_started: self.runs_started.load(Ordering::Relaxed),
            runs_notified: self.runs_notified.load(Ordering::Relaxed),
            runs_exhausted: self.runs_exhausted.load(Ordering::Relaxed),
            failed_attempts: self.failed_attempts.load(Ordering::Relaxed),
            records_skipped: self.records_skipped.load(Ordering::Relaxed),
        }
    }
}
