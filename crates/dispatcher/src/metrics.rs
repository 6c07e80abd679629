//! Dispatcher counters for the run summary

use std::sync::atomic::{AtomicU64, Ordering};

/// Dispatcher metrics, readable from other threads while the loop runs
#[derive(Debug, Default)]
pub struct DispatcherMetrics {
    /// Messages taken from the release queue
    dispatched: AtomicU64,
    /// Renders that returned an error
    render_failures: AtomicU64,
    /// Directive keys that fell back to defaults
    parameter_fallbacks: AtomicU64,
    /// Heartbeats handed to the outbound queue
    heartbeats: AtomicU64,
}

impl DispatcherMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    pub fn inc_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn render_failures(&self) -> u64 {
        self.render_failures.load(Ordering::Relaxed)
    }

    pub fn inc_render_failures(&self) {
        self.render_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn parameter_fallbacks(&self) -> u64 {
        self.parameter_fallbacks.load(Ordering::Relaxed)
    }

    pub fn add_parameter_fallbacks(&self, count: usize) {
        self.parameter_fallbacks
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn heartbeats(&self) -> u64 {
        self.heartbeats.load(Ordering::Relaxed)
    }

    pub fn inc_heartbeats(&self) {
        self.heartbeats.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            dispatched: self.dispatched(),
            render_failures: self.render_failures(),
            parameter_fallbacks: self.parameter_fallbacks(),
            heartbeats: self.heartbeats(),
        }
    }
}

/// Snapshot of dispatcher metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub dispatched: u64,
    pub render_failures: u64,
    pub parameter_fallbacks: u64,
    pub heartbeats: u64,
}
