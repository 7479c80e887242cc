//! Wire frames
//!
//! A frame is the atomic unit exchanged with the peer.

use super::{FrameKind, Topic};
use bytes::Bytes;

/// One decoded or to-be-encoded protocol message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Liveness probe
    Ping,
    /// Liveness reply
    Pong,
    /// Command request
    Cmd { id: String, body: Bytes },
    /// Successful command response
    Res { id: String, body: Bytes },
    /// Failed command response
    Err { id: String, message: Bytes },
    /// Unsolicited event
    Evt { topic: Topic, body: Bytes },
    /// A kind this client does not understand (body, if any, already skipped)
    Unknown { kind: String },
}

impl Frame {
    /// Build a command frame
    pub fn command(id: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self::Cmd {
            id: id.into(),
            body: body.into(),
        }
    }

    /// Build a success response frame
    pub fn response(id: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self::Res {
            id: id.into(),
            body: body.into(),
        }
    }

    /// Build an error response frame
    pub fn error(id: impl Into<String>, message: impl Into<Bytes>) -> Self {
        Self::Err {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Build an event frame
    pub fn event(topic: impl Into<Topic>, body: impl Into<Bytes>) -> Self {
        Self::Evt {
            topic: topic.into(),
            body: body.into(),
        }
    }

    /// Kind of this frame, `None` for unknown kinds
    #[must_use]
    pub fn kind(&self) -> Option<FrameKind> {
        match self {
            Self::Ping => Some(FrameKind::Ping),
            Self::Pong => Some(FrameKind::Pong),
            Self::Cmd { .. } => Some(FrameKind::Cmd),
            Self::Res { .. } => Some(FrameKind::Res),
            Self::Err { .. } => Some(FrameKind::Err),
            Self::Evt { .. } => Some(FrameKind::Evt),
            Self::Unknown { .. } => None,
        }
    }

    /// Correlation id for CMD/RES/ERR frames
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Cmd { id, .. } | Self::Res { id, .. } | Self::Err { id, .. } => Some(id),
            _ => None,
        }
    }

    /// Body bytes, empty for frames without one
    #[must_use]
    pub fn body(&self) -> &[u8] {
        match self {
            Self::Cmd { body, .. } | Self::Res { body, .. } | Self::Evt { body, .. } => body,
            Self::Err { message, .. } => message,
            _ => &[],
        }
    }
}
