//! Bridge client
//!
//! The public face of the crate: start the supervisor, send commands,
//! subscribe to events, inspect status and shut down.

use crate::breaker::{BreakerState, CircuitBreaker};
use crate::broadcast::{EventFanout, Subscription};
use crate::connection::{self, LinkState};
use crate::correlator::Correlator;
use crate::error::{BridgeError, BridgeResult};
use crate::options::ClientOptions;
use crate::protocol::{valid_key, Frame};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// State shared between the client handle and its background tasks
pub(crate) struct Shared {
    pub(crate) options: ClientOptions,
    pub(crate) link: LinkState,
    pub(crate) correlator: Arc<Correlator>,
    pub(crate) fanout: EventFanout,
    pub(crate) breaker: CircuitBreaker,
    pub(crate) outbound_tx: mpsc::Sender<Frame>,
    pub(crate) outbound_rx: Arc<AsyncMutex<mpsc::Receiver<Frame>>>,
    pub(crate) shutdown: CancellationToken,
}

impl Shared {
    /// A fresh socket became the active connection
    pub(crate) fn install(&self) -> u64 {
        self.breaker.reset();
        self.link.mark_connected()
    }

    /// The active connection is gone: nothing in flight may wait on it
    pub(crate) fn connection_lost(&self) {
        self.link.mark_disconnected();

        let failed = self.correlator.fail_all(|| BridgeError::Unavailable);
        let stale = self.drain_outbound();
        if failed > 0 || stale > 0 {
            tracing::debug!(
                failed_requests = failed,
                dropped_frames = stale,
                "Cleared in-flight state of lost connection"
            );
        }
    }

    fn drain_outbound(&self) -> usize {
        let Ok(mut queue) = self.outbound_rx.try_lock() else {
            return 0;
        };
        let mut dropped = 0;
        while queue.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }

    fn queued_writes(&self) -> usize {
        self.outbound_tx.max_capacity() - self.outbound_tx.capacity()
    }
}

/// Per-call overrides for [`BridgeClient::send_with`]
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Caller deadline; the effective timeout is the shorter of this and the command timeout
    pub timeout: Option<Duration>,
    /// Cancels the wait when fired
    pub cancel: Option<CancellationToken>,
    /// Use this correlation id instead of a generated one
    pub id: Option<String>,
}

impl SendOptions {
    /// Set a caller deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set a cancellation token
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Set the correlation id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Snapshot returned by [`BridgeClient::status`]
#[derive(Debug, Clone, Serialize)]
pub struct ClientStatus {
    pub addr: String,
    pub connected: bool,
    pub breaker_state: BreakerState,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub queued_writes: usize,
    pub pending_requests: usize,
    pub subscribers: usize,
    pub dial_attempts: u64,
    pub connections: u64,
    pub closed: bool,
}

/// Resilient client for the bridge peer
pub struct BridgeClient {
    shared: Arc<Shared>,
    started: AtomicBool,
    closed: AtomicBool,
    supervisor: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl BridgeClient {
    /// Create a client for the peer at `addr`. Nothing is dialed until [`start`](Self::start).
    pub fn new(addr: impl Into<String>, options: ClientOptions) -> Self {
        let options = options.normalized();
        let (outbound_tx, outbound_rx) = mpsc::channel(options.write_queue_capacity);

        let shared = Shared {
            link: LinkState::new(addr),
            correlator: Arc::new(Correlator::new()),
            fanout: EventFanout::new(options.default_subscriber_buffer),
            breaker: CircuitBreaker::new(options.breaker_failures, options.breaker_open_for),
            outbound_tx,
            outbound_rx: Arc::new(AsyncMutex::new(outbound_rx)),
            shutdown: CancellationToken::new(),
            options,
        };

        Self {
            shared: Arc::new(shared),
            started: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            supervisor: parking_lot::Mutex::new(None),
        }
    }

    /// Start the background supervisor. Calling it again is a no-op.
    ///
    /// Cancelling `token` stops the client the same way [`close`](Self::close) does,
    /// except that nothing waits for the background tasks.
    pub fn start(&self, token: CancellationToken) {
        if self.closed.load(Ordering::Acquire) || self.started.swap(true, Ordering::AcqRel) {
            tracing::debug!("Bridge client already started");
            return;
        }

        let shutdown = self.shared.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => shutdown.cancel(),
                () = shutdown.cancelled() => {}
            }
        });

        let handle = tokio::spawn(connection::supervise(Arc::clone(&self.shared)));
        *self.supervisor.lock() = Some(handle);
    }

    /// Send `payload` as a command and wait for its response body
    pub async fn send(&self, payload: impl Into<Bytes>) -> BridgeResult<Bytes> {
        self.send_with(payload, SendOptions::default()).await
    }

    /// Send with a caller deadline, cancellation token or fixed id
    pub async fn send_with(
        &self,
        payload: impl Into<Bytes>,
        options: SendOptions,
    ) -> BridgeResult<Bytes> {
        let shared = &self.shared;
        if self.is_closed() {
            return Err(BridgeError::Closed);
        }

        let payload = payload.into();
        if payload.len() > shared.options.max_body {
            return Err(BridgeError::bad_frame(format!(
                "payload of {} bytes exceeds limit of {}",
                payload.len(),
                shared.options.max_body
            )));
        }
        if let Some(id) = options.id.as_deref() {
            if !valid_key(id) {
                return Err(BridgeError::bad_frame(format!("invalid request id {id:?}")));
            }
            if shared.correlator.is_pending(id) {
                return Err(BridgeError::bad_frame(format!("request id {id} already pending")));
            }
        }

        if !shared.link.is_healthy() {
            shared.breaker.record_failure();
            return Err(BridgeError::Unavailable);
        }
        let Some(permit) = shared.breaker.acquire() else {
            return Err(BridgeError::BreakerOpen);
        };

        let id = options.id.unwrap_or_else(Correlator::next_id);
        let Some(mut pending) = shared.correlator.register(id.clone()) else {
            permit.release();
            return Err(BridgeError::bad_frame(format!("request id {id} already pending")));
        };
        // a teardown between the health check and register has already run fail_all
        if !shared.link.is_healthy() {
            permit.failure();
            return Err(BridgeError::Unavailable);
        }

        let timeout = options
            .timeout
            .map_or(shared.options.command_timeout, |t| {
                t.min(shared.options.command_timeout)
            });
        let cancel = options.cancel;
        let cancelled = async {
            match &cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending::<()>().await,
            }
        };
        let exchange = async {
            shared
                .outbound_tx
                .send(Frame::command(id.as_str(), payload))
                .await
                .map_err(|_| BridgeError::Closed)?;
            pending.wait().await
        };

        let outcome = tokio::select! {
            biased;
            () = shared.shutdown.cancelled() => Err(BridgeError::Closed),
            () = cancelled => Err(BridgeError::Cancelled),
            result = tokio::time::timeout(timeout, exchange) => {
                result.unwrap_or(Err(BridgeError::Timeout(timeout)))
            }
        };

        match &outcome {
            Ok(_) => permit.success(),
            Err(BridgeError::Closed) => permit.release(),
            Err(e) => {
                tracing::debug!(id = %id, error = %e, code = e.error_code(), "Command failed");
                permit.failure();
            }
        }

        outcome
    }

    /// Register for inbound events. `buffer == 0` picks the configured default.
    pub fn subscribe(&self, buffer: usize) -> Subscription {
        self.shared.fanout.subscribe(buffer)
    }

    /// Current connection, breaker and queue state
    pub fn status(&self) -> ClientStatus {
        let shared = &self.shared;
        ClientStatus {
            addr: shared.link.addr().to_string(),
            connected: shared.link.is_healthy(),
            breaker_state: shared.breaker.state(),
            last_heartbeat: shared.link.last_heartbeat(),
            queued_writes: shared.queued_writes(),
            pending_requests: shared.correlator.len(),
            subscribers: shared.fanout.subscriber_count(),
            dial_attempts: shared.link.dial_attempts(),
            connections: shared.link.connections(),
            closed: self.is_closed(),
        }
    }

    /// Whether the client is connected to a healthy peer
    pub fn is_connected(&self) -> bool {
        self.shared.link.is_healthy()
    }

    /// Whether the client has been closed or its start token cancelled
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.shared.shutdown.is_cancelled()
    }

    /// Options in effect after normalization
    pub fn options(&self) -> &ClientOptions {
        &self.shared.options
    }

    /// Stop all background work, fail pending requests and release the socket.
    ///
    /// Safe to call more than once; later calls return immediately.
    pub async fn close(&self) -> BridgeResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let shared = &self.shared;

        shared.shutdown.cancel();
        shared.correlator.fail_all(|| BridgeError::Closed);

        let handle = self.supervisor.lock().take();
        if let Some(mut handle) = handle {
            let grace = shared.options.shutdown_grace;
            if tokio::time::timeout(grace, &mut handle).await.is_err() {
                tracing::warn!(grace_ms = grace.as_millis(), "Supervisor did not stop in time, aborting");
                handle.abort();
            }
        }

        shared.link.mark_disconnected();
        shared.fanout.clear();
        tracing::info!(addr = %shared.link.addr(), "Bridge client closed");
        Ok(())
    }
}

impl Drop for BridgeClient {
    fn drop(&mut self) {
        self.shared.shutdown.cancel();
    }
}

impl std::fmt::Debug for BridgeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeClient")
            .field("addr", &self.shared.link.addr())
            .field("connected", &self.shared.link.is_healthy())
            .field("closed", &self.is_closed())
            .finish()
    }
}
