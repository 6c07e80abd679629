//! Pipeline statistics and metrics.

use std::time::Duration;

use dispatcher::MetricsSnapshot;
use ingestion::AdapterMetricsSnapshot;
use observability::MetricsSummary;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Per-feed counters in registration order
    pub feeds: Vec<(String, AdapterMetricsSnapshot)>,

    /// Dispatcher counters
    pub dispatcher: MetricsSnapshot,

    /// Dispatch aggregation (lateness, per-source counts)
    pub dispatch: MetricsSummary,

    /// Messages still waiting for their release time at shutdown
    pub pending: usize,

    /// Feeds that stopped with an error
    pub feed_errors: Vec<String>,
}

impl PipelineStats {
    /// Messages pushed to the release queue by every feed
    pub fn messages_queued(&self) -> u64 {
        self.feeds.iter().map(|(_, m)| m.messages_queued).sum()
    }

    /// Dispatched messages per minute
    pub fn dispatch_rate(&self) -> f64 {
        let minutes = self.duration.as_secs_f64() / 60.0;
        if minutes > 0.0 {
            self.dispatcher.dispatched as f64 / minutes
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                      Pipeline Statistics                     ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Messages queued: {}", self.messages_queued());
        println!("   ├─ Messages dispatched: {}", self.dispatcher.dispatched);
        println!("   ├─ Still pending: {}", self.pending);
        println!("   ├─ Rate: {:.2}/min", self.dispatch_rate());
        println!("   └─ Heartbeats: {}", self.dispatcher.heartbeats);

        println!("\n📈 Dispatch");
        println!(
            "   ├─ Render failures: {} ({:.2}%)",
            self.dispatch.total_failed, self.dispatch.failure_rate
        );
        println!("   ├─ Parameter fallbacks: {}", self.dispatch.total_fallbacks);
        println!("   └─ Lateness (ms): {}", self.dispatch.lateness_ms);

        if !self.feeds.is_empty() {
            println!("\n📬 Feeds");
            let last = self.feeds.len() - 1;
            for (i, (name, m)) in self.feeds.iter().enumerate() {
                let branch = if i == last { "└─" } else { "├─" };
                println!(
                    "   {branch} {name}: fetched={} queued={} filtered={} reconnects={} failures={} sent={} send_failed={}",
                    m.items_fetched,
                    m.messages_queued,
                    m.items_filtered,
                    m.reconnects,
                    m.failures,
                    m.outbound_sent,
                    m.outbound_failed
                );
            }
        }

        if !self.feed_errors.is_empty() {
            println!("\n⚠️  Feed Errors");
            for error in &self.feed_errors {
                println!("   ├─ {}", error);
            }
        }

        println!();
    }
}
