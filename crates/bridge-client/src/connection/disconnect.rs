//! Why a connection run ended

use crate::error::BridgeError;
use std::fmt;

/// Reason a connection run ended
#[derive(Debug)]
pub enum DisconnectReason {
    /// The client is shutting down
    Shutdown,
    /// The peer closed the socket
    PeerClosed,
    /// Reading from the socket failed
    ReadFailed(BridgeError),
    /// Writing to the socket failed or hit its deadline
    WriteFailed(BridgeError),
    /// Too many consecutive PINGs went unanswered
    HeartbeatMissed(u32),
    /// A connection task ended abnormally
    TaskFailed(String),
}

impl DisconnectReason {
    /// Whether the supervisor should stop instead of redialing
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        matches!(self, Self::Shutdown)
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shutdown => f.write_str("shutdown"),
            Self::PeerClosed => f.write_str("peer closed the connection"),
            Self::ReadFailed(e) => write!(f, "read failed: {e}"),
            Self::WriteFailed(e) => write!(f, "write failed: {e}"),
            Self::HeartbeatMissed(misses) => write!(f, "{misses} heartbeats missed"),
            Self::TaskFailed(task) => write!(f, "{task} task failed"),
        }
    }
}
