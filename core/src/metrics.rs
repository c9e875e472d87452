/// Ingest metrics
///
/// Counts merge outcomes and re-broadcast samples so the transport can
/// report how much of the incoming gossip is redundant.

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Operations that changed state
    pub applied: u64,

    /// Duplicates and replays (clock not newer than the stored one)
    pub stale: u64,

    /// Malformed operations
    pub rejected: u64,

    /// Operations handed out for re-broadcast
    pub sampled: u64,
}

impl MetricsSnapshot {
    /// Share of received operations that were redundant
    pub fn stale_ratio(&self) -> f64 {
        let total = self.applied + self.stale + self.rejected;
        if total == 0 {
            return 0.0;
        }
        self.stale as f64 / total as f64
    }

    /// Counts accumulated after `earlier` was taken
    pub fn since(&self, earlier: &MetricsSnapshot) -> MetricsSnapshot {
        MetricsSnapshot {
            applied: self.applied.saturating_sub(earlier.applied),
            stale: self.stale.saturating_sub(earlier.stale),
            rejected: self.rejected.saturating_sub(earlier.rejected),
            sampled: self.sampled.saturating_sub(earlier.sampled),
        }
    }
}

#[derive(Debug, Default)]
pub struct MergeMetrics {
    applied: AtomicU64,
    stale: AtomicU64,
    rejected: AtomicU64,
    sampled: AtomicU64,
}

impl MergeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_applied(&self) {
        self.applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale(&self) {
        self.stale.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sampled(&self, count: usize) {
        self.sampled.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            applied: self.applied.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            sampled: self.sampled.load(Ordering::Relaxed),
        }
    }
}
