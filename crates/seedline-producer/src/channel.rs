//! Unbounded hand-off channel between seed producers and consumers.
//!
//! The channel carries [`QueueEntry`] values: work items tagged with their
//! provenance, and one [`QueueEntry::Sentinel`] per producer marking the end
//! of that producer's output. Writers never block; readers either take what
//! is there or wait for a bounded time.

use seedline_core::{ProducerId, WorkItem, WorkItemId};
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Where a queued item came from in the discovery graph.
///
/// Seeds are roots, so both fields are empty for them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Provenance {
    /// Item whose processing produced this one
    pub parent: Option<WorkItemId>,
    /// Plugin that produced this item
    pub origin: Option<String>,
}

impl Provenance {
    /// Empty provenance for items with no parent.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Whether this item is a root of the discovery graph.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.is_none() && self.origin.is_none()
    }
}

/// One entry in a [`SeedOutputChannel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEntry {
    /// A work item ready for consumers.
    Item {
        /// Provenance tags
        provenance: Provenance,
        /// The request descriptor
        item: WorkItem,
    },
    /// The producer identified by `producer` will enqueue nothing further.
    Sentinel {
        /// Producer that emitted the sentinel
        producer: ProducerId,
    },
}

impl QueueEntry {
    /// Tag a seed item with empty provenance.
    #[must_use]
    pub fn seed(item: WorkItem) -> Self {
        Self::Item {
            provenance: Provenance::root(),
            item,
        }
    }

    /// Whether this entry is a terminal sentinel.
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Self::Sentinel { .. })
    }

    /// Borrow the work item, if this entry carries one.
    #[must_use]
    pub fn as_item(&self) -> Option<&WorkItem> {
        match self {
            Self::Item { item, .. } => Some(item),
            Self::Sentinel { .. } => None,
        }
    }

    /// Take the work item, if this entry carries one.
    #[must_use]
    pub fn into_item(self) -> Option<WorkItem> {
        match self {
            Self::Item { item, .. } => Some(item),
            Self::Sentinel { .. } => None,
        }
    }
}

/// Unbounded multi-producer, multi-consumer FIFO of [`QueueEntry`].
///
/// Clones share the same queue. Every entry is delivered to at most one
/// consumer.
#[derive(Debug, Clone, Default)]
pub struct SeedOutputChannel {
    queue: Arc<Mutex<VecDeque<QueueEntry>>>,
    notify: Arc<Notify>,
}

impl SeedOutputChannel {
    /// Create an empty channel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave the deque half-updated,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, VecDeque<QueueEntry>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an entry. Never blocks.
    pub fn enqueue(&self, entry: QueueEntry) {
        self.lock().push_back(entry);
        self.notify.notify_one();
    }

    /// Take the oldest entry without waiting.
    #[must_use]
    pub fn try_dequeue(&self) -> Option<QueueEntry> {
        self.lock().pop_front()
    }

    /// Take the oldest entry, waiting at most `timeout` for one to arrive.
    ///
    /// Returns `None` when nothing arrived in time, including when another
    /// consumer took the entry first.
    pub async fn poll(&self, timeout: Duration) -> Option<QueueEntry> {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(entry) = self.try_dequeue() {
                return Some(entry);
            }

            // `notify_one` stores a permit when nobody is waiting, so an
            // enqueue between the check above and this await is not lost.
            if tokio::time::timeout_at(deadline, self.notify.notified())
                .await
                .is_err()
            {
                return self.try_dequeue();
            }
        }
    }

    /// Current number of undelivered entries.
    #[must_use]
    pub fn size(&self) -> usize {
        self.lock().len()
    }

    /// Whether the channel currently holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Counts sentinels seen by a consumer to decide when every started
/// producer has finished.
#[derive(Debug, Clone)]
pub struct SentinelTally {
    expected: usize,
    seen: HashSet<ProducerId>,
}

impl SentinelTally {
    /// Track completion of `expected` producers.
    #[must_use]
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            seen: HashSet::new(),
        }
    }

    /// Record an entry. Returns `true` if it was a sentinel not seen before.
    pub fn observe(&mut self, entry: &QueueEntry) -> bool {
        match entry {
            QueueEntry::Sentinel { producer } => self.seen.insert(*producer),
            QueueEntry::Item { .. } => false,
        }
    }

    /// Number of distinct producers that have finished.
    #[must_use]
    pub fn finished(&self) -> usize {
        self.seen.len()
    }

    /// Whether every expected producer has emitted its sentinel.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.seen.len() >= self.expected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn item(path: &str) -> WorkItem {
        WorkItem::get(Url::parse(&format!("http://a.example{path}")).expect("valid URL"))
    }

    #[test]
    fn test_fifo_order() {
        let channel = SeedOutputChannel::new();
        channel.enqueue(QueueEntry::seed(item("/1")));
        channel.enqueue(QueueEntry::seed(item("/2")));

        assert_eq!(channel.size(), 2);
        assert_eq!(
            channel.try_dequeue().and_then(QueueEntry::into_item),
            Some(item("/1"))
        );
        assert_eq!(
            channel.try_dequeue().and_then(QueueEntry::into_item),
            Some(item("/2"))
        );
        assert!(channel.try_dequeue().is_none());
    }

    #[test]
    fn test_clones_share_queue() {
        let producer_side = SeedOutputChannel::new();
        let consumer_side = producer_side.clone();

        assert!(consumer_side.is_empty());
        producer_side.enqueue(QueueEntry::seed(item("/")));
        assert!(!consumer_side.is_empty());
        assert!(consumer_side.try_dequeue().is_some());
        assert!(producer_side.is_empty());
    }

    #[test]
    fn test_sentinel_is_distinct_from_items() {
        let sentinel = QueueEntry::Sentinel {
            producer: ProducerId::generate(),
        };
        let seed = QueueEntry::seed(item("/"));

        assert!(sentinel.is_sentinel());
        assert!(sentinel.as_item().is_none());
        assert!(!seed.is_sentinel());
        match seed {
            QueueEntry::Item { provenance, .. } => assert!(provenance.is_root()),
            QueueEntry::Sentinel { .. } => panic!("expected an item"),
        }
    }

    #[tokio::test]
    async fn test_poll_times_out_when_empty() {
        let channel = SeedOutputChannel::new();
        let started = std::time::Instant::now();
        assert!(channel.poll(Duration::from_millis(20)).await.is_none());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_poll_wakes_on_enqueue() {
        let channel = SeedOutputChannel::new();
        let writer = channel.clone();

        let waiter = tokio::spawn(async move { channel.poll(Duration::from_secs(5)).await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        writer.enqueue(QueueEntry::seed(item("/late")));

        let entry = waiter.await.expect("poll task");
        assert_eq!(entry.and_then(QueueEntry::into_item), Some(item("/late")));
    }

    #[test]
    fn test_sentinel_tally() {
        let first = ProducerId::generate();
        let second = ProducerId::generate();
        let mut tally = SentinelTally::new(2);

        assert!(!tally.observe(&QueueEntry::seed(item("/"))));
        assert!(tally.observe(&QueueEntry::Sentinel { producer: first }));
        assert!(!tally.observe(&QueueEntry::Sentinel { producer: first }));
        assert!(!tally.is_complete());

        assert!(tally.observe(&QueueEntry::Sentinel { producer: second }));
        assert_eq!(tally.finished(), 2);
        assert!(tally.is_complete());
    }
}
