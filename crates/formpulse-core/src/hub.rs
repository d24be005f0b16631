//! Broadcast hub
//!
//! In-memory registry of per-form topics. Each subscriber owns a bounded
//! queue; publishing never waits on a slow viewer, it drops the payload for
//! that viewer instead.

use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{self, error::TrySendError};

/// Pending payloads a subscriber may hold before new ones are dropped.
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 8;

type Topic = HashMap<u64, mpsc::Sender<Bytes>>;

/// Topic registry keyed by form id.
///
/// Construct once at startup and share it (`Arc<Hub>`) with whatever
/// publishes or streams.
pub struct Hub {
    topics: RwLock<HashMap<String, Topic>>,
    next_id: AtomicU64,
    capacity: usize,
}

/// A subscriber's end of a topic. Used to receive and to ask for removal.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    rx: mpsc::Receiver<Bytes>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Next payload. `None` once the hub has released this handle.
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }

    /// Next payload if one is already queued.
    pub fn try_recv(&mut self) -> Option<Bytes> {
        self.rx.try_recv().ok()
    }
}

impl Hub {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SUBSCRIBER_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            capacity: capacity.max(1),
        }
    }

    /// Register a new handle, creating the topic on first use.
    pub fn subscribe(&self, form_id: &str) -> Subscription {
        let (tx, rx) = mpsc::channel(self.capacity);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        self.topics
            .write()
            .entry(form_id.to_string())
            .or_default()
            .insert(id, tx);

        tracing::debug!(form_id, subscriber = id, "subscribed");
        Subscription { id, rx }
    }

    /// Remove a handle; drops the topic when it was the last one.
    /// Unknown handles are ignored.
    pub fn unsubscribe(&self, form_id: &str, sub: &Subscription) {
        let mut topics = self.topics.write();
        let Some(topic) = topics.get_mut(form_id) else {
            return;
        };
        if topic.remove(&sub.id).is_some() {
            tracing::debug!(form_id, subscriber = sub.id, "unsubscribed");
        }
        if topic.is_empty() {
            topics.remove(form_id);
        }
    }

    /// Queue `payload` on every handle of the topic without blocking.
    ///
    /// Returns how many handles accepted it. Full or closed handles miss this
    /// payload and are not retried.
    pub fn publish(&self, form_id: &str, payload: Bytes) -> usize {
        let topics = self.topics.read();
        let Some(topic) = topics.get(form_id) else {
            return 0;
        };

        let mut delivered = 0;
        for (id, tx) in topic {
            match tx.try_send(payload.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::debug!(form_id, subscriber = id, "subscriber full, dropping update");
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(form_id, subscriber = id, "subscriber gone, dropping update");
                }
            }
        }
        delivered
    }

    pub fn topic_count(&self) -> usize {
        self.topics.read().len()
    }

    pub fn subscriber_count(&self, form_id: &str) -> usize {
        self.topics.read().get(form_id).map_or(0, HashMap::len)
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}
