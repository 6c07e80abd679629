//! Per-adapter counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Adapter metrics, shared with the runtime for the run summary
#[derive(Debug, Default)]
pub struct AdapterMetrics {
    /// Items returned by the source
    pub items_fetched: AtomicU64,

    /// Messages pushed to the release queue
    pub messages_queued: AtomicU64,

    /// Items dropped by the strategy (heartbeat, empty)
    pub items_filtered: AtomicU64,

    /// Successful connects after the first one
    pub reconnects: AtomicU64,

    /// Failed connect or poll attempts
    pub failures: AtomicU64,

    /// Outbound items accepted by the source
    pub outbound_sent: AtomicU64,

    /// Outbound items the source refused
    pub outbound_failed: AtomicU64,
}

impl AdapterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_fetched(&self, count: usize) {
        self.items_fetched
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_queued(&self) {
        self.messages_queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_filtered(&self) {
        self.items_filtered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_outbound(&self, success: bool) {
        let counter = if success {
            &self.outbound_sent
        } else {
            &self.outbound_failed
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> AdapterMetricsSnapshot {
        AdapterMetricsSnapshot {
            items_fetched: self.items_fetched.load(Ordering::Relaxed),
            messages_queued: self.messages_queued.load(Ordering::Relaxed),
            items_filtered: self.items_filtered.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            outbound_sent: self.outbound_sent.load(Ordering::Relaxed),
            outbound_failed: self.outbound_failed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`AdapterMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdapterMetricsSnapshot {
    pub items_fetched: u64,
    pub messages_queued: u64,
    pub items_filtered: u64,
    pub reconnects: u64,
    pub failures: u64,
    pub outbound_sent: u64,
    pub outbound_failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_records() {
        let metrics = AdapterMetrics::new();
        metrics.record_fetched(3);
        metrics.record_queued();
        metrics.record_queued();
        metrics.record_filtered();
        metrics.record_outbound(true);
        metrics.record_outbound(false);

        let snap = metrics.snapshot();
        assert_eq!(snap.items_fetched, 3);
        assert_eq!(snap.messages_queued, 2);
        assert_eq!(snap.items_filtered, 1);
        assert_eq!(snap.outbound_sent, 1);
        assert_eq!(snap.outbound_failed, 1);
        assert_eq!(snap.reconnects, 0);
    }
}
