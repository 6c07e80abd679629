//! Pipeline orchestrator - coordinates feeds, dispatcher and heartbeats.
//!
//! Every configured feed is backed by the scripted mock transport; the
//! dispatcher renders to the log.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{FeedKind, RuntimeBlueprint};
use dispatcher::{Dispatcher, DispatcherHandle, LivenessReporter, LogOutput};
use ingestion::{IngestionPipeline, MockSource};
use scheduler::{ReleaseQueue, StopSignal};
use tracing::{info, warn};

use super::PipelineStats;
use crate::error::CliError;

/// How often the orchestrator checks for stop conditions
const WATCH_INTERVAL: Duration = Duration::from_millis(200);

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The runtime blueprint
    pub blueprint: RuntimeBlueprint,

    /// Stop after this long (None = until stopped)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,

    /// Send heartbeats when the blueprint enables them
    pub liveness: bool,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until `stop` is signalled, the timeout elapses, or every feed exits
    pub async fn run(self, stop: StopSignal) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Setup Ingestion
        info!("Setting up feed adapters...");
        let queue = Arc::new(ReleaseQueue::new());
        let mut ingestion = IngestionPipeline::new(Arc::clone(&queue), stop.clone());
        for feed in &blueprint.feeds {
            info!(
                feed = %feed.name,
                kind = ?feed.kind,
                scripted = feed.script.len(),
                "Registering feed (mock transport)"
            );
            let source = MockSource::from_script(&feed.script);
            if feed.kind == FeedKind::Social {
                source.cursor_only();
            }
            ingestion.register_feed(feed, source);
        }

        if ingestion.feed_count() == 0 {
            warn!("No feeds configured - nothing will be queued");
        }

        let liveness = self.liveness_reporter(&ingestion)?;

        // Setup Dispatcher
        let tick_interval = blueprint.dispatcher.tick_interval;
        let dispatcher = Dispatcher::new(
            Arc::clone(&queue),
            LogOutput::new("log"),
            blueprint.dispatcher.output.to_params(),
        );

        ingestion
            .start_all()
            .context("Failed to start feed adapters")?;
        info!(feeds = ingestion.feed_count(), "Feed adapters started");

        let dispatch_handle =
            DispatcherHandle::spawn(dispatcher, stop.clone(), tick_interval, liveness)
                .context("Failed to start dispatcher")?;
        info!("Dispatcher started");

        let deadline = self.config.timeout.map(|timeout| Instant::now() + timeout);
        let mut watch = tokio::time::interval(WATCH_INTERVAL);
        loop {
            watch.tick().await;
            if stop.is_stopped() || dispatch_handle.is_finished() {
                break;
            }
            if ingestion.all_finished() {
                warn!("Every feed adapter has exited, stopping");
                break;
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                info!("Run timeout reached, stopping");
                break;
            }
        }

        // Shutdown
        info!("Shutting down pipeline...");
        stop.stop();

        let dispatcher_metrics = Arc::clone(dispatch_handle.metrics());
        let dispatch = tokio::task::spawn_blocking(move || dispatch_handle.join())
            .await
            .map_err(|e| CliError::dispatcher(e.to_string()))?
            .map_err(|e| CliError::dispatcher(e.to_string()))?;

        let (feeds, feed_errors) = tokio::task::spawn_blocking(move || {
            let errors = ingestion.join_all();
            (ingestion.metrics(), errors)
        })
        .await
        .context("Failed to join feed adapters")?;

        for error in &feed_errors {
            warn!(feed = %error.adapter(), error = %error, "Feed adapter failed");
        }

        let stats = PipelineStats {
            duration: start_time.elapsed(),
            feeds,
            dispatcher: dispatcher_metrics.snapshot(),
            dispatch,
            pending: queue.len(),
            feed_errors: feed_errors.iter().map(ToString::to_string).collect(),
        };

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            dispatched = stats.dispatcher.dispatched,
            pending = stats.pending,
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }

    /// Heartbeats go out through the configured feed, or the first one
    fn liveness_reporter(&self, ingestion: &IngestionPipeline) -> Result<Option<LivenessReporter>> {
        let settings = &self.config.blueprint.liveness;
        if !self.config.liveness || !settings.enabled {
            info!("Liveness reporting disabled");
            return Ok(None);
        }

        let target = match &settings.feed {
            Some(name) => ingestion
                .outbound(name)
                .map(|outbound| (name.clone(), outbound))
                .ok_or_else(|| CliError::liveness_target(name))?,
            None => match ingestion.first_outbound() {
                Some(target) => target,
                None => {
                    warn!("Liveness enabled but no feed to carry heartbeats");
                    return Ok(None);
                }
            },
        };

        info!(
            feed = %target.0,
            min_period_secs = settings.min_period.as_secs(),
            max_period_secs = settings.max_period.as_secs(),
            "Liveness reporting enabled"
        );
        Ok(Some(LivenessReporter::from_settings(target.1, settings)))
    }
}
