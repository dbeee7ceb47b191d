// Search instrumentation
//
// Counts visited nodes and times each top-level decision. The node counter is bumped
// from every branch of a parallel search, so it is a plain atomic; the stopwatch is
// only touched by the facade before and after a search.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Snapshot of the statistics after a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SearchSummary {
    pub nodes_visited: u64,
    pub elapsed: Duration,
}

#[derive(Debug, Default)]
pub struct SearchStats {
    nodes: AtomicU64,
    stopwatch: Mutex<Stopwatch>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Stopwatch {
    started: Option<Instant>,
    stopped: Option<Instant>,
}

impl SearchStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_node(&self) {
        self.nodes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn nodes_visited(&self) -> u64 {
        self.nodes.load(Ordering::Relaxed)
    }

    pub fn start_stopwatch(&self) {
        let mut stopwatch = self.stopwatch.lock();
        stopwatch.started = Some(Instant::now());
        stopwatch.stopped = None;
    }

    pub fn stop_stopwatch(&self) {
        self.stopwatch.lock().stopped = Some(Instant::now());
    }

    /// Time between the last start and stop, zero if the stopwatch never completed
    pub fn elapsed(&self) -> Duration {
        let stopwatch = *self.stopwatch.lock();
        match (stopwatch.started, stopwatch.stopped) {
            (Some(started), Some(stopped)) => stopped.saturating_duration_since(started),
            _ => Duration::ZERO,
        }
    }

    pub fn summary(&self) -> SearchSummary {
        SearchSummary {
            nodes_visited: self.nodes_visited(),
            elapsed: self.elapsed(),
        }
    }

    /// Zeroes the node counter and the stopwatch
    pub fn reset(&self) {
        self.nodes.store(0, Ordering::Relaxed);
        *self.stopwatch.lock() = Stopwatch::default();
    }
}
