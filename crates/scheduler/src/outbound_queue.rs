//! Outbound (reply / heartbeat) queue drained by a feed adapter.
//!
//! FIFO ring buffer behind a mutex + condvar. Outbound traffic is best-effort:
//! when the ring is full the oldest item is overwritten and counted.

use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use contracts::OutboundItem;
use ringbuf::{traits::*, HeapRb};
use tracing::warn;

/// Default ring capacity
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

struct State {
    items: HeapRb<OutboundItem>,
    dropped: u64,
    /// Delivery result of the most recent heartbeat, not yet collected
    heartbeat_report: Option<bool>,
}

/// Bounded multi-producer queue with a bounded blocking pop
pub struct OutboundQueue {
    state: Mutex<State>,
    ready: Condvar,
    capacity: usize,
}

impl fmt::Debug for OutboundQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutboundQueue")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .field("dropped", &self.dropped_count())
            .finish()
    }
}

impl Default for OutboundQueue {
    fn default() -> Self {
        Self::new(DEFAULT_OUTBOUND_CAPACITY)
    }
}

impl OutboundQueue {
    /// Create a queue holding at most `capacity` items
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(State {
                items: HeapRb::new(capacity),
                dropped: 0,
                heartbeat_report: None,
            }),
            ready: Condvar::new(),
            capacity,
        }
    }

    /// Enqueue; overwrites the oldest item when full
    pub fn push(&self, item: OutboundItem) {
        {
            let mut state = self.lock();
            if let Some(old) = state.items.push_overwrite(item) {
                warn!(kind = ?old.kind, "outbound queue full, oldest item dropped");
                state.dropped += 1;
            }
        }
        self.ready.notify_one();
    }

    /// Dequeue without waiting
    pub fn try_pop(&self) -> Option<OutboundItem> {
        self.lock().items.try_pop()
    }

    /// Wait up to `timeout` for an item
    pub fn pop_blocking(&self, timeout: Duration) -> Option<OutboundItem> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        loop {
            if let Some(item) = state.items.try_pop() {
                return Some(item);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let (guard, _) = self
                .ready
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
        }
    }

    pub fn len(&self) -> usize {
        self.lock().items.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Items overwritten because the ring was full
    pub fn dropped_count(&self) -> u64 {
        self.lock().dropped
    }

    /// Record whether the last heartbeat reached the source
    pub fn report_heartbeat(&self, delivered: bool) {
        self.lock().heartbeat_report = Some(delivered);
    }

    /// Collect the pending heartbeat delivery result, if any
    pub fn take_heartbeat_report(&self) -> Option<bool> {
        self.lock().heartbeat_report.take()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
