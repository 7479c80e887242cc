//! Connection state shared between the supervisor, the transport and callers

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Health of the link to the peer
#[derive(Debug)]
pub struct LinkState {
    addr: String,
    healthy: AtomicBool,
    last_heartbeat: RwLock<Option<DateTime<Utc>>>,
    dial_attempts: AtomicU64,
    connections: AtomicU64,
}

impl LinkState {
    /// Create the state for a peer at `addr`, initially disconnected
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            healthy: AtomicBool::new(false),
            last_heartbeat: RwLock::new(None),
            dial_attempts: AtomicU64::new(0),
            connections: AtomicU64::new(0),
        }
    }

    /// Peer address
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Whether a socket is installed and believed healthy
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    /// A new socket was installed
    pub(crate) fn mark_connected(&self) -> u64 {
        self.healthy.store(true, Ordering::Release);
        self.connections.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// The active socket is gone
    pub(crate) fn mark_disconnected(&self) {
        self.healthy.store(false, Ordering::Release);
    }

    /// A PONG arrived
    pub(crate) fn record_heartbeat(&self) {
        *self.last_heartbeat.write() = Some(Utc::now());
    }

    /// When the last PONG arrived
    pub fn last_heartbeat(&self) -> Option<DateTime<Utc>> {
        *self.last_heartbeat.read()
    }

    pub(crate) fn record_dial_attempt(&self) -> u64 {
        self.dial_attempts.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Dial attempts since the client started
    pub fn dial_attempts(&self) -> u64 {
        self.dial_attempts.load(Ordering::Relaxed)
    }

    /// Connections established since the client started
    pub fn connections(&self) -> u64 {
        self.connections.load(Ordering::Relaxed)
    }
}
