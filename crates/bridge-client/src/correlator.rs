//! Request correlator
//!
//! Parks one response slot per in-flight command id and resolves it when the
//! matching RES/ERR arrives, or fails it when the connection goes away.

use crate::error::{BridgeError, BridgeResult};
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// Outcome delivered to a waiting caller
pub type Reply = BridgeResult<Bytes>;

struct Slot {
    tx: oneshot::Sender<Reply>,
    created_at: Instant,
}

/// In-flight request table keyed by correlation id
#[derive(Default)]
pub struct Correlator {
    pending: Mutex<HashMap<String, Slot>>,
}

impl Correlator {
    /// Create an empty correlator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a fresh correlation id
    #[must_use]
    pub fn next_id() -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }

    /// Register a slot for `id`. Returns `None` if that id is still pending.
    pub fn register(self: &Arc<Self>, id: impl Into<String>) -> Option<PendingRequest> {
        let id = id.into();
        let (tx, rx) = oneshot::channel();

        let mut pending = self.pending.lock();
        if pending.contains_key(&id) {
            return None;
        }
        pending.insert(
            id.clone(),
            Slot {
                tx,
                created_at: Instant::now(),
            },
        );
        drop(pending);

        tracing::trace!(id = %id, "Request registered");

        Some(PendingRequest {
            id,
            rx,
            correlator: Arc::clone(self),
        })
    }

    /// Deliver a reply to the caller waiting on `id`.
    ///
    /// Returns `false` when nobody is waiting (late or unknown response).
    pub fn resolve(&self, id: &str, reply: Reply) -> bool {
        let slot = self.pending.lock().remove(id);
        match slot {
            Some(slot) => {
                tracing::trace!(
                    id = %id,
                    elapsed_ms = slot.created_at.elapsed().as_millis(),
                    "Request resolved"
                );
                // the caller may have given up in the meantime
                slot.tx.send(reply).is_ok()
            }
            None => {
                tracing::debug!(id = %id, "Response for unknown or expired request, ignoring");
                false
            }
        }
    }

    /// Drop the slot for `id` without delivering anything
    pub fn remove(&self, id: &str) -> bool {
        self.pending.lock().remove(id).is_some()
    }

    /// Fail every pending request with the error produced by `make_err`
    pub fn fail_all(&self, make_err: impl Fn() -> BridgeError) -> usize {
        let drained: Vec<(String, Slot)> = self.pending.lock().drain().collect();
        let count = drained.len();

        for (_, slot) in drained {
            let _ = slot.tx.send(Err(make_err()));
        }

        if count > 0 {
            tracing::debug!(count = count, "Failed all pending requests");
        }
        count
    }

    /// Whether `id` currently has a waiting caller
    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.lock().contains_key(id)
    }

    /// Number of requests in flight
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Whether no request is in flight
    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

impl std::fmt::Debug for Correlator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Correlator")
            .field("pending", &self.len())
            .finish()
    }
}

/// A registered request waiting for its reply.
///
/// Dropping it removes the id from the table, so every exit path of a caller
/// (reply, timeout, cancellation, a dropped future) leaves no entry behind.
pub struct PendingRequest {
    id: String,
    rx: oneshot::Receiver<Reply>,
    correlator: Arc<Correlator>,
}

impl PendingRequest {
    /// Correlation id of this request
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wait for the reply. A slot dropped without a reply reads as `Unavailable`.
    pub async fn wait(&mut self) -> Reply {
        (&mut self.rx).await.unwrap_or(Err(BridgeError::Unavailable))
    }
}

impl Drop for PendingRequest {
    fn drop(&mut self) {
        self.correlator.remove(&self.id);
    }
}

impl std::fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRequest").field("id", &self.id).finish()
    }
}
