//! DispatcherHandle - a dispatcher running on its own thread

use std::any::Any;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use contracts::OutputAction;
use observability::MetricsSummary;
use scheduler::StopSignal;
use tracing::debug;

use crate::dispatcher::Dispatcher;
use crate::error::DispatcherError;
use crate::liveness::LivenessReporter;
use crate::metrics::DispatcherMetrics;

/// Handle to a running dispatcher thread
pub struct DispatcherHandle {
    metrics: Arc<DispatcherMetrics>,
    worker_handle: JoinHandle<MetricsSummary>,
}

impl DispatcherHandle {
    /// Move `dispatcher` onto a thread named `dispatcher` and run it until `stop`
    pub fn spawn<O: OutputAction + 'static>(
        mut dispatcher: Dispatcher<O>,
        stop: StopSignal,
        tick_interval: Duration,
        liveness: Option<LivenessReporter>,
    ) -> Result<Self, DispatcherError> {
        let metrics = dispatcher.metrics();
        let worker_handle = std::thread::Builder::new()
            .name("dispatcher".into())
            .spawn(move || dispatcher.run(&stop, tick_interval, liveness))?;
        debug!("dispatcher thread spawned");
        Ok(Self {
            metrics,
            worker_handle,
        })
    }

    /// Live counters of the running dispatcher
    pub fn metrics(&self) -> &Arc<DispatcherMetrics> {
        &self.metrics
    }

    /// The thread has returned (stopped or panicked)
    pub fn is_finished(&self) -> bool {
        self.worker_handle.is_finished()
    }

    /// Wait for the thread; only returns once the stop signal was observed
    pub fn join(self) -> Result<MetricsSummary, DispatcherError> {
        self.worker_handle
            .join()
            .map_err(|payload| DispatcherError::panicked(panic_message(payload.as_ref())))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
