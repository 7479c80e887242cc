//! Bridge error types
//!
//! Every failure a caller of the bridge can observe is one of these kinds.

use std::time::Duration;
use thiserror::Error;

/// Bridge client error type
#[derive(Debug, Error)]
pub enum BridgeError {
    /// No healthy connection to the peer
    #[error("connection unavailable")]
    Unavailable,

    /// No response within the command deadline
    #[error("timed out after {0:?} waiting for response")]
    Timeout(Duration),

    /// Fast-fail while the circuit breaker is open
    #[error("circuit breaker open")]
    BreakerOpen,

    /// The client has been shut down
    #[error("client closed")]
    Closed,

    /// Malformed wire data
    #[error("bad frame: {0}")]
    BadFrame(String),

    /// The peer answered the command with an ERR frame
    #[error("peer error: {0}")]
    Remote(String),

    /// The caller cancelled the request
    #[error("request cancelled")]
    Cancelled,

    /// Socket level failure
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Whether a caller may retry the operation on the same client
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Closed)
    }

    /// Stable error code for logs and operator output
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unavailable => "UNAVAILABLE",
            Self::Timeout(_) => "TIMEOUT",
            Self::BreakerOpen => "BREAKER_OPEN",
            Self::Closed => "CLOSED",
            Self::BadFrame(_) => "BAD_FRAME",
            Self::Remote(_) => "REMOTE_ERROR",
            Self::Cancelled => "CANCELLED",
            Self::Io(_) => "IO_ERROR",
        }
    }

    /// Create a bad frame error
    #[must_use]
    pub fn bad_frame(reason: impl std::fmt::Display) -> Self {
        Self::BadFrame(reason.to_string())
    }
}

/// Result type alias for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;
