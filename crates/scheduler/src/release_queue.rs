//! Time-ordered release queue shared by all feed adapters.
//!
//! Uses index-based separation like the other buffers in this workspace:
//! - BinaryHeap stores lightweight slots (release time + sequence + slab key)
//! - Slab stores the actual ScheduledMessage
//!
//! Both live under one mutex, so peek-then-pop is a single atomic step and a
//! message that is not yet due is never taken out of the queue.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use contracts::{ScheduledMessage, Timestamp};
use slab::Slab;
use tracing::trace;

/// Heap entry; ordered so that `BinaryHeap` pops the earliest release first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    release_time: Timestamp,
    /// Insertion order, breaks release-time ties
    seq: u64,
    slab_key: usize,
}

impl Ord for Slot {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: earliest release, then earliest insertion
        other
            .release_time
            .cmp(&self.release_time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Slot {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Default)]
struct Inner {
    heap: BinaryHeap<Slot>,
    storage: Slab<ScheduledMessage>,
    next_seq: u64,
}

/// Counters describing queue traffic
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub pushed: u64,
    pub released: u64,
    pub pending: usize,
}

/// Thread-safe min-heap of pending messages keyed by release time
///
/// Many producers may `push` concurrently; the single consumer calls
/// [`ReleaseQueue::try_pop_due`]. No iteration or removal-by-value is exposed.
#[derive(Default)]
pub struct ReleaseQueue {
    inner: Mutex<Inner>,
    pushed: AtomicU64,
    released: AtomicU64,
}

impl fmt::Debug for ReleaseQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReleaseQueue")
            .field("pending", &self.len())
            .field("pushed", &self.pushed.load(AtomicOrdering::Relaxed))
            .field("released", &self.released.load(AtomicOrdering::Relaxed))
            .finish()
    }
}

impl ReleaseQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a message; callable from any thread
    pub fn push(&self, message: ScheduledMessage) {
        let release_time = message.release_time;
        let depth = {
            let mut inner = self.lock();
            let seq = inner.next_seq;
            inner.next_seq += 1;
            let slab_key = inner.storage.insert(message);
            inner.heap.push(Slot {
                release_time,
                seq,
                slab_key,
            });
            inner.heap.len()
        };
        self.pushed.fetch_add(1, AtomicOrdering::Relaxed);
        observability::record_queue_depth(depth);
        trace!(%release_time, depth, "message queued");
    }

    /// Remove and return the earliest message if `release_time <= now`
    ///
    /// Returns `None` without touching the queue when it is empty or the
    /// earliest message is still in the future.
    pub fn try_pop_due(&self, now: Timestamp) -> Option<ScheduledMessage> {
        let (message, depth) = {
            let mut inner = self.lock();
            let slot = *inner.heap.peek()?;
            if slot.release_time > now {
                return None;
            }
            inner.heap.pop();
            let message = inner.storage.remove(slot.slab_key);
            (message, inner.heap.len())
        };
        self.released.fetch_add(1, AtomicOrdering::Relaxed);
        observability::record_queue_depth(depth);
        Some(message)
    }

    /// Release time of the earliest pending message
    pub fn next_release_time(&self) -> Option<Timestamp> {
        self.lock().heap.peek().map(|slot| slot.release_time)
    }

    pub fn len(&self) -> usize {
        self.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().heap.is_empty()
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            pushed: self.pushed.load(AtomicOrdering::Relaxed),
            released: self.released.load(AtomicOrdering::Relaxed),
            pending: self.len(),
        }
    }

    // Every mutation leaves heap and slab consistent before it can panic,
    // so a poisoned lock still guards valid data.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, Utc};
    use contracts::Directives;
    use rand::seq::SliceRandom;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn make_message(text: &str, release_time: Timestamp) -> ScheduledMessage {
        ScheduledMessage::new(release_time, text, Directives::new(), "test")
    }

    #[test]
    fn test_pop_order_by_release_time() {
        let queue = ReleaseQueue::new();
        let t0 = Utc::now();

        queue.push(make_message("c", t0 + TimeDelta::seconds(3)));
        queue.push(make_message("a", t0 + TimeDelta::seconds(1)));
        queue.push(make_message("b", t0 + TimeDelta::seconds(2)));

        let later = t0 + TimeDelta::seconds(10);
        assert_eq!(queue.try_pop_due(later).unwrap().text, "a");
        assert_eq!(queue.try_pop_due(later).unwrap().text, "b");
        assert_eq!(queue.try_pop_due(later).unwrap().text, "c");
        assert!(queue.try_pop_due(later).is_none());
    }

    #[test]
    fn test_future_item_stays_queued() {
        let queue = ReleaseQueue::new();
        let t0 = Utc::now();
        queue.push(make_message("later", t0 + TimeDelta::seconds(5)));

        assert!(queue.try_pop_due(t0).is_none());
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.next_release_time(), Some(t0 + TimeDelta::seconds(5)));

        // Due boundary is inclusive
        let msg = queue.try_pop_due(t0 + TimeDelta::seconds(5)).unwrap();
        assert_eq!(msg.text, "later");
        assert!(queue.is_empty());
    }

    #[test]
    fn test_ties_broken_by_insertion_order() {
        let queue = ReleaseQueue::new();
        let t0 = Utc::now();
        for name in ["first", "second", "third"] {
            queue.push(make_message(name, t0));
        }

        assert_eq!(queue.try_pop_due(t0).unwrap().text, "first");
        assert_eq!(queue.try_pop_due(t0).unwrap().text, "second");
        assert_eq!(queue.try_pop_due(t0).unwrap().text, "third");
    }

    #[test]
    fn test_past_release_time_is_immediately_due() {
        let queue = ReleaseQueue::new();
        let now = Utc::now();
        queue.push(make_message("stale", now - TimeDelta::hours(1)));
        assert_eq!(queue.try_pop_due(now).unwrap().text, "stale");
    }

    #[test]
    fn test_monotonic_drain_never_duplicates_or_releases_early() {
        let queue = ReleaseQueue::new();
        let t0 = Utc::now();
        let mut offsets: Vec<i64> = (0..200).collect();
        offsets.shuffle(&mut rand::rng());
        for offset in &offsets {
            queue.push(make_message(
                &offset.to_string(),
                t0 + TimeDelta::milliseconds(offset * 10),
            ));
        }

        let mut seen = HashSet::new();
        let mut last = None;
        let mut now = t0;
        while seen.len() < offsets.len() {
            while let Some(msg) = queue.try_pop_due(now) {
                assert!(msg.release_time <= now, "released before due");
                if let Some(prev) = last {
                    assert!(msg.release_time >= prev, "out of order");
                }
                last = Some(msg.release_time);
                assert!(seen.insert(msg.text), "duplicate release");
            }
            now += TimeDelta::milliseconds(7);
        }
        assert!(queue.is_empty());
        assert_eq!(queue.stats().released, 200);
    }

    #[test]
    fn test_concurrent_producers_lose_nothing() {
        const PRODUCERS: usize = 8;
        const PER_PRODUCER: usize = 100;

        let queue = Arc::new(ReleaseQueue::new());
        let t0 = Utc::now();

        let handles: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        let at = t0 + TimeDelta::milliseconds((i % 17) as i64);
                        queue.push(make_message(&format!("{p}-{i}"), at));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(queue.len(), PRODUCERS * PER_PRODUCER);

        let mut seen = HashSet::new();
        let later = t0 + TimeDelta::seconds(1);
        while let Some(msg) = queue.try_pop_due(later) {
            assert!(seen.insert(msg.text));
        }
        assert_eq!(seen.len(), PRODUCERS * PER_PRODUCER);
    }

    #[test]
    fn test_concurrent_consumers_release_each_item_once() {
        let queue = Arc::new(ReleaseQueue::new());
        let t0 = Utc::now();
        for i in 0..500 {
            queue.push(make_message(&i.to_string(), t0));
        }

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || {
                    let mut taken = Vec::new();
                    while let Some(msg) = queue.try_pop_due(t0) {
                        taken.push(msg.text);
                    }
                    taken
                })
            })
            .collect();

        let mut all = HashSet::new();
        for handle in handles {
            for text in handle.join().unwrap() {
                assert!(all.insert(text));
            }
        }
        assert_eq!(all.len(), 500);
    }
}
