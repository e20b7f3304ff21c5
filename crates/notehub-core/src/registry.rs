//! Per-note connection registry for real-time fan-out.
//!
//! Each live viewer of a note owns a bounded `mpsc` queue. The registry keeps
//! the sending halves grouped by note id; transport adapters drain the
//! receiving halves and write to the wire.
//!
//! ## Delivery
//!
//! Broadcasting never blocks and never fails. Sender handles are copied out
//! of the map before any send, so no shard lock is held while delivering.
//! Each subscriber then gets a `try_send`:
//!
//! - queue full: the message is dropped for that subscriber only (`warn`)
//! - receiver gone: the subscriber is pruned (`debug`)
//!
//! Ordering per subscriber follows the order of `broadcast` calls.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::defaults::SUBSCRIBER_BUFFER;
use crate::WebSocketEvent;

/// Serialized event shared by every subscriber of one broadcast.
pub type Message = Arc<str>;

/// Handle identifying one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Receiving side handed to a transport adapter by [`ConnectionRegistry::subscribe`].
#[derive(Debug)]
pub struct Subscription {
    pub note_id: String,
    pub id: SubscriberId,
    pub rx: mpsc::Receiver<Message>,
}

#[derive(Debug, Clone)]
struct Subscriber {
    id: SubscriberId,
    tx: mpsc::Sender<Message>,
}

/// Concurrency-safe map from note id to its live subscribers.
#[derive(Debug)]
pub struct ConnectionRegistry {
    notes: DashMap<String, Vec<Subscriber>>,
    next_id: AtomicU64,
    buffer: usize,
}

impl ConnectionRegistry {
    /// Create a registry whose `subscribe` queues hold `buffer` messages.
    pub fn new(buffer: usize) -> Self {
        Self {
            notes: DashMap::new(),
            next_id: AtomicU64::new(1),
            buffer: buffer.max(1),
        }
    }

    /// Register an existing sender under `note_id`.
    pub fn add(&self, note_id: &str, tx: mpsc::Sender<Message>) -> SubscriberId {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let subscriber_count = {
            let mut subs = self.notes.entry(note_id.to_string()).or_default();
            subs.push(Subscriber { id, tx });
            subs.len()
        };
        tracing::debug!(note_id, subscriber_id = %id, subscriber_count, "Subscriber added");
        id
    }

    /// Create a bounded queue and register its sender under `note_id`.
    pub fn subscribe(&self, note_id: &str) -> Subscription {
        let (tx, rx) = mpsc::channel(self.buffer);
        let id = self.add(note_id, tx);
        Subscription {
            note_id: note_id.to_string(),
            id,
            rx,
        }
    }

    /// Deregister one subscriber. The note's entry goes away with its last
    /// subscriber. Returns false if the subscriber was not registered.
    pub fn remove(&self, note_id: &str, id: SubscriberId) -> bool {
        let removed = match self.notes.get_mut(note_id) {
            Some(mut subs) => {
                let before = subs.len();
                subs.retain(|s| s.id != id);
                subs.len() != before
            }
            None => false,
        };
        // Re-checked under the shard lock: an `add` may have landed in between.
        self.notes.remove_if(note_id, |_, subs| subs.is_empty());

        if removed {
            tracing::debug!(note_id, subscriber_id = %id, "Subscriber removed");
        }
        removed
    }

    /// Deliver `message` to every subscriber of `note_id`. Returns how many
    /// queues accepted it.
    pub fn broadcast(&self, note_id: &str, message: impl Into<Message>) -> usize {
        let targets: Vec<Subscriber> = match self.notes.get(note_id) {
            Some(subs) => subs.clone(),
            None => return 0,
        };
        let message = message.into();

        let mut delivered = 0;
        let mut closed = Vec::new();
        for sub in &targets {
            match sub.tx.try_send(Arc::clone(&message)) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        note_id,
                        subscriber_id = %sub.id,
                        "Subscriber queue full, dropping message"
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(note_id, subscriber_id = %sub.id, "Subscriber gone");
                    closed.push(sub.id);
                }
            }
        }
        for id in closed {
            self.remove(note_id, id);
        }

        tracing::debug!(
            note_id,
            subscriber_count = targets.len(),
            delivered,
            "Broadcast"
        );
        delivered
    }

    /// Serialize and broadcast an event to its note's subscribers.
    pub fn broadcast_event(&self, event: &WebSocketEvent) -> usize {
        match event.to_json() {
            Ok(json) => self.broadcast(event.note_id(), json),
            Err(e) => {
                tracing::warn!(
                    note_id = event.note_id(),
                    event_type = event.event_type(),
                    error = %e,
                    "Failed to serialize event"
                );
                0
            }
        }
    }

    /// Drop every subscriber of `note_id`. Their receivers see end-of-stream
    /// once queued messages are drained. Returns how many were closed.
    pub fn close_by_id(&self, note_id: &str) -> usize {
        let closed = self
            .notes
            .remove(note_id)
            .map(|(_, subs)| subs.len())
            .unwrap_or(0);
        if closed > 0 {
            tracing::info!(note_id, subscriber_count = closed, "Closed note subscribers");
        }
        closed
    }

    /// Drop every subscriber of every note, e.g. on server shutdown.
    /// Returns how many were closed.
    pub fn close_all(&self) -> usize {
        let note_ids: Vec<String> = self.notes.iter().map(|e| e.key().clone()).collect();
        let closed: usize = note_ids
            .iter()
            .filter_map(|id| self.notes.remove(id))
            .map(|(_, subs)| subs.len())
            .sum();
        if closed > 0 {
            tracing::info!(
                note_count = note_ids.len(),
                subscriber_count = closed,
                "Closed all subscribers"
            );
        }
        closed
    }

    pub fn subscriber_count(&self, note_id: &str) -> usize {
        self.notes.get(note_id).map(|subs| subs.len()).unwrap_or(0)
    }

    /// Number of notes with at least one subscriber.
    pub fn note_count(&self) -> usize {
        self.notes.len()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new(SUBSCRIBER_BUFFER)
    }
}
