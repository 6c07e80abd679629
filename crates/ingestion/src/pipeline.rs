//! Ingestion Pipeline main entry
//!
//! Owns every feed adapter, starts one thread per feed and joins them on
//! shutdown. All adapters share one release queue and one stop signal.

use std::sync::Arc;
use std::thread::JoinHandle;

use contracts::{FeedConfig, OutboundSender, SourcePoller};
use scheduler::{OutboundQueue, ReleaseQueue, StopSignal};
use tracing::{debug, info, instrument, warn};

use crate::adapter::{FeedAdapter, FeedAdapterSettings};
use crate::error::{IngestionError, Result};
use crate::metrics::{AdapterMetrics, AdapterMetricsSnapshot};
use crate::strategy::{strategy_for, FeedStrategy};

/// Type-erased adapter waiting to be started
trait PendingFeed: Send {
    fn spawn(self: Box<Self>) -> Result<JoinHandle<Result<()>>>;
}

impl<C, S> PendingFeed for FeedAdapter<C, S>
where
    C: SourcePoller + OutboundSender + 'static,
    S: FeedStrategy + 'static,
{
    fn spawn(self: Box<Self>) -> Result<JoinHandle<Result<()>>> {
        FeedAdapter::spawn(*self)
    }
}

struct FeedSlot {
    name: String,
    outbound: Arc<OutboundQueue>,
    metrics: Arc<AdapterMetrics>,
    pending: Option<Box<dyn PendingFeed>>,
    handle: Option<JoinHandle<Result<()>>>,
}

/// Ingestion Pipeline
pub struct IngestionPipeline {
    queue: Arc<ReleaseQueue>,
    stop: StopSignal,
    feeds: Vec<FeedSlot>,
}

impl IngestionPipeline {
    pub fn new(queue: Arc<ReleaseQueue>, stop: StopSignal) -> Self {
        Self {
            queue,
            stop,
            feeds: Vec::new(),
        }
    }

    /// Register a configured feed backed by `client`
    #[instrument(
        name = "ingestion_register_feed",
        skip(self, config, client),
        fields(feed = %config.name, kind = ?config.kind)
    )]
    pub fn register_feed<C>(&mut self, config: &FeedConfig, client: C)
    where
        C: SourcePoller + OutboundSender + 'static,
    {
        let adapter = FeedAdapter::new(
            FeedAdapterSettings::from(config),
            client,
            strategy_for(config),
            Arc::clone(&self.queue),
            self.stop.clone(),
        );
        self.register_adapter(adapter);
    }

    /// Register an already-built adapter
    pub fn register_adapter<C, S>(&mut self, adapter: FeedAdapter<C, S>)
    where
        C: SourcePoller + OutboundSender + 'static,
        S: FeedStrategy + 'static,
    {
        debug!(feed = %adapter.name(), "registered feed adapter");
        self.feeds.push(FeedSlot {
            name: adapter.name().to_string(),
            outbound: adapter.outbound(),
            metrics: adapter.metrics(),
            pending: Some(Box::new(adapter)),
            handle: None,
        });
    }

    /// Start every registered feed on its own thread
    #[instrument(name = "ingestion_start_all", skip(self))]
    pub fn start_all(&mut self) -> Result<()> {
        info!(count = self.feeds.len(), "starting feed adapters");
        for slot in &mut self.feeds {
            if let Some(pending) = slot.pending.take() {
                slot.handle = Some(pending.spawn()?);
            }
        }
        Ok(())
    }

    /// Signal every adapter to stop
    pub fn stop_all(&self) {
        self.stop.stop();
    }

    /// Wait for every started adapter; returns the errors they ended with
    #[instrument(name = "ingestion_join_all", skip(self))]
    pub fn join_all(&mut self) -> Vec<IngestionError> {
        let mut errors = Vec::new();
        for slot in &mut self.feeds {
            let Some(handle) = slot.handle.take() else {
                continue;
            };
            match handle.join() {
                Ok(Ok(())) => debug!(feed = %slot.name, "feed thread joined"),
                Ok(Err(e)) => errors.push(e),
                Err(_) => {
                    warn!(feed = %slot.name, "feed thread panicked");
                    errors.push(IngestionError::Panicked {
                        adapter: slot.name.clone(),
                    });
                }
            }
        }
        errors
    }

    /// Started feeds whose thread has exited
    pub fn finished_count(&self) -> usize {
        self.feeds
            .iter()
            .filter(|slot| slot.handle.as_ref().is_some_and(|h| h.is_finished()))
            .count()
    }

    /// Every started feed has exited (stop or fatal error)
    pub fn all_finished(&self) -> bool {
        let started = self.feeds.iter().filter(|s| s.handle.is_some()).count();
        started > 0 && self.finished_count() == started
    }

    /// Outbound queue of the named feed
    pub fn outbound(&self, name: &str) -> Option<Arc<OutboundQueue>> {
        self.feeds
            .iter()
            .find(|slot| slot.name == name)
            .map(|slot| Arc::clone(&slot.outbound))
    }

    /// Outbound queue of the first registered feed
    pub fn first_outbound(&self) -> Option<(String, Arc<OutboundQueue>)> {
        self.feeds
            .first()
            .map(|slot| (slot.name.clone(), Arc::clone(&slot.outbound)))
    }

    /// Per-feed metric snapshots in registration order
    pub fn metrics(&self) -> Vec<(String, AdapterMetricsSnapshot)> {
        self.feeds
            .iter()
            .map(|slot| (slot.name.clone(), slot.metrics.snapshot()))
            .collect()
    }

    pub fn feed_count(&self) -> usize {
        self.feeds.len()
    }

    pub fn queue(&self) -> Arc<ReleaseQueue> {
        Arc::clone(&self.queue)
    }
}

impl Drop for IngestionPipeline {
    fn drop(&mut self) {
        self.stop_all();
    }
}
