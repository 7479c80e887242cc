//! Event fan-out
//!
//! Every subscriber owns a bounded channel. Delivery never waits: a full
//! channel loses that one event, a closed one is pruned.

use super::Event;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

type Subscribers = DashMap<u64, mpsc::Sender<Event>>;

/// One-to-many distributor of inbound events
pub struct EventFanout {
    subscribers: Arc<Subscribers>,
    next_id: AtomicU64,
    default_buffer: usize,
}

impl EventFanout {
    /// Create a fan-out whose `subscribe(0)` uses `default_buffer`
    #[must_use]
    pub fn new(default_buffer: usize) -> Self {
        Self {
            subscribers: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(1),
            default_buffer: default_buffer.max(1),
        }
    }

    /// Register a subscriber with a channel of `buffer` slots (0 = default)
    pub fn subscribe(&self, buffer: usize) -> Subscription {
        let buffer = if buffer == 0 { self.default_buffer } else { buffer };
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(buffer);

        self.subscribers.insert(id, tx);
        tracing::debug!(subscription_id = id, buffer = buffer, "Subscriber added");

        Subscription {
            id,
            receiver: rx,
            cancel: CancelHandle {
                id,
                subscribers: Arc::clone(&self.subscribers),
            },
        }
    }

    /// Deliver `event` to every subscriber without blocking.
    ///
    /// Returns the number of subscribers that accepted it.
    pub fn publish(&self, event: &Event) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();

        for entry in self.subscribers.iter() {
            match entry.value().try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(
                        subscription_id = *entry.key(),
                        topic = %event.topic,
                        "Subscriber buffer full, dropping event"
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => closed.push(*entry.key()),
            }
        }

        // removal happens after iteration; DashMap shards are still read-locked above
        for id in closed {
            self.subscribers.remove(&id);
            tracing::debug!(subscription_id = id, "Pruned closed subscriber");
        }

        delivered
    }

    /// Remove a subscription by id. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: u64) -> bool {
        self.subscribers.remove(&id).is_some()
    }

    /// Drop every subscription, closing all channels
    pub fn clear(&self) {
        self.subscribers.clear();
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl Default for EventFanout {
    fn default() -> Self {
        Self::new(2048)
    }
}

impl std::fmt::Debug for EventFanout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventFanout")
            .field("subscribers", &self.subscribers.len())
            .field("default_buffer", &self.default_buffer)
            .finish()
    }
}

/// A live subscription: its id, its receiving end and its cancel handle
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    receiver: mpsc::Receiver<Event>,
    cancel: CancelHandle,
}

impl Subscription {
    /// Subscription id
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Receive the next event; `None` once cancelled and drained
    pub async fn recv(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    /// Receive without waiting
    pub fn try_recv(&mut self) -> Result<Event, mpsc::error::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Cancel this subscription; further calls are no-ops
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Cloneable cancel handle for this subscription
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Split into `(id, receiver, cancel)`
    pub fn into_parts(self) -> (u64, mpsc::Receiver<Event>, CancelHandle) {
        (self.id, self.receiver, self.cancel)
    }
}

/// Removes a subscription from the fan-out and closes its channel
#[derive(Clone)]
pub struct CancelHandle {
    id: u64,
    subscribers: Arc<Subscribers>,
}

impl CancelHandle {
    /// Remove the subscription. Calling it again does nothing.
    pub fn cancel(&self) {
        if self.subscribers.remove(&self.id).is_some() {
            tracing::debug!(subscription_id = self.id, "Subscriber cancelled");
        }
    }

    /// Whether the subscription has been removed
    pub fn is_cancelled(&self) -> bool {
        !self.subscribers.contains_key(&self.id)
    }
}

impl std::fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelHandle").field("id", &self.id).finish()
    }
}
