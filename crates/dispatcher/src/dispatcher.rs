//! Dispatcher - single consumer of the release queue
//!
//! Each tick takes at most one due message, applies its parameters over the
//! defaults and renders it. Pacing comes from `OutputAction::is_idle`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use contracts::{OutputAction, OutputParams, ScheduledMessage, Timestamp};
use observability::{DispatchMetricsAggregator, MetricsSummary};
use scheduler::{ReleaseQueue, StopSignal};
use tracing::{debug, error, info, instrument, warn};

use crate::liveness::LivenessReporter;
use crate::metrics::{DispatcherMetrics, MetricsSnapshot};
use crate::params::{directives_to_params, merge_over_defaults};

/// Wait between idle checks while the output is busy
pub const BUSY_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Result of one dispatched message
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    pub message: ScheduledMessage,
    /// Parameters in effect for the render
    pub params: OutputParams,
    /// Directive keys that fell back to the default
    pub fallbacks: Vec<String>,
    pub rendered: bool,
    /// `now - release_time` at dispatch
    pub lateness: TimeDelta,
}

/// The main Dispatcher driving one output action
pub struct Dispatcher<O> {
    queue: Arc<ReleaseQueue>,
    output: O,
    defaults: OutputParams,
    metrics: Arc<DispatcherMetrics>,
    aggregator: DispatchMetricsAggregator,
}

impl<O: OutputAction> Dispatcher<O> {
    /// `defaults` are re-applied under every message's own parameters
    pub fn new(queue: Arc<ReleaseQueue>, output: O, defaults: OutputParams) -> Self {
        Self {
            queue,
            output,
            defaults,
            metrics: Arc::new(DispatcherMetrics::new()),
            aggregator: DispatchMetricsAggregator::new(),
        }
    }

    pub fn metrics(&self) -> Arc<DispatcherMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn summary(&self) -> MetricsSummary {
        self.aggregator.summary()
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    /// Dispatch the earliest message if it is due at `now`
    pub fn tick(&mut self, now: Timestamp) -> Option<DispatchOutcome> {
        let message = self.queue.try_pop_due(now)?;
        let lateness = now - message.release_time;

        let mapping = directives_to_params(&message.directives);
        let mut fallbacks = mapping.rejected;
        for key in &fallbacks {
            warn!(
                source = %message.source,
                key = %key,
                value = message.directives.get(key).map(String::as_str).unwrap_or_default(),
                "directive value not usable, default kept"
            );
        }

        let merged = merge_over_defaults(&self.defaults, &mapping.params);
        let params = match self.output.apply_parameters(&merged) {
            Ok(()) => merged,
            Err(e) => {
                warn!(error = %e, "output rejected parameters, using defaults");
                fallbacks.extend(mapping.params.keys().cloned());
                if let Err(e) = self.output.apply_parameters(&self.defaults) {
                    error!(error = %e, "output rejected default parameters");
                }
                self.defaults.clone()
            }
        };
        for key in &fallbacks {
            observability::record_parameter_fallback(key);
        }

        let rendered = match self.output.render(&message.text) {
            Ok(()) => true,
            Err(e) => {
                error!(source = %message.source, error = %e, "render failed, message consumed");
                self.metrics.inc_render_failures();
                false
            }
        };

        let lateness_ms = lateness.num_milliseconds() as f64;
        self.metrics.inc_dispatched();
        self.metrics.add_parameter_fallbacks(fallbacks.len());
        self.aggregator
            .update(&message.source, lateness_ms, fallbacks.len(), rendered);
        observability::record_message_dispatched(&message.source, lateness_ms, rendered);
        info!(
            source = %message.source,
            release_time = %message.release_time,
            lateness_ms,
            text = %message.text,
            "message dispatched"
        );

        Some(DispatchOutcome {
            message,
            params,
            fallbacks,
            rendered,
            lateness,
        })
    }

    /// Sleep until the next release or `tick_interval`, whichever is sooner
    fn idle_wait(&self, now: Timestamp, tick_interval: Duration) -> Duration {
        match self.queue.next_release_time() {
            Some(next) if next > now => (next - now)
                .to_std()
                .map_or(tick_interval, |until| until.min(tick_interval)),
            Some(_) => Duration::ZERO,
            None => tick_interval,
        }
    }

    /// Run until `stop` is signalled; returns the dispatch summary
    #[instrument(name = "dispatcher_run", skip_all, fields(output = %self.output.name()))]
    pub fn run(
        &mut self,
        stop: &StopSignal,
        tick_interval: Duration,
        mut liveness: Option<LivenessReporter>,
    ) -> MetricsSummary {
        info!(
            tick_interval_ms = tick_interval.as_millis() as u64,
            liveness = liveness.is_some(),
            "Dispatcher started"
        );

        while !stop.is_stopped() {
            let now = Utc::now();
            if let Some(reporter) = liveness.as_mut() {
                if reporter.poll(now) {
                    self.metrics.inc_heartbeats();
                }
            }

            if !self.output.is_idle() {
                stop.sleep(BUSY_POLL_INTERVAL);
                continue;
            }

            if self.tick(now).is_none() {
                let wait = self.idle_wait(now, tick_interval);
                if !wait.is_zero() {
                    stop.sleep(wait);
                }
            }
        }

        let pending = self.queue.len();
        if pending > 0 {
            warn!(pending, "Dispatcher stopped with undelivered messages");
        }
        debug!(metrics = ?self.metrics.snapshot(), "Dispatcher shutdown complete");
        self.aggregator.summary()
    }
}
