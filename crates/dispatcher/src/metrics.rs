//! Client metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for a single client
#[derive(Debug, Default)]
pub struct ClientMetrics {
    /// Total successful writes
    write_count: AtomicU64,
    /// Total successful reads
    read_count: AtomicU64,
    /// Total failed calls (reads and writes)
    failure_count: AtomicU64,
}

impl ClientMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Get total write count
    pub fn write_count(&self) -> u64 {
        self.write_count.load(Ordering::Relaxed)
    }

    /// Increment write count
    pub fn inc_write_count(&self) {
        self.write_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get total read count
    pub fn read_count(&self) -> u64 {
        self.read_count.load(Ordering::Relaxed)
    }

    /// Increment read count
    pub fn inc_read_count(&self) {
        self.read_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get failure count
    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    /// Increment failure count
    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            write_count: self.write_count(),
            read_count: self.read_count(),
            failure_count: self.failure_count(),
        }
    }
}

/// Snapshot of client metrics (for reporting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub write_count: u64,
    pub read_count: u64,
    pub failure_count: u64,
}
