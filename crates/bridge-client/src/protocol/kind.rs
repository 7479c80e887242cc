//! Frame kinds
//!
//! The first token of every header line names the kind of frame that follows.

use std::fmt;

/// Wire frame kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Liveness probe (client to peer)
    Ping,
    /// Liveness reply (peer to client)
    Pong,
    /// Command request carrying an id and a payload (client to peer)
    Cmd,
    /// Successful command response (peer to client)
    Res,
    /// Failed command response, body is the error message (peer to client)
    Err,
    /// Unsolicited event under a topic (peer to client)
    Evt,
}

impl FrameKind {
    /// Parse a header token, `None` for kinds this client does not know
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "PING" => Some(Self::Ping),
            "PONG" => Some(Self::Pong),
            "CMD" => Some(Self::Cmd),
            "RES" => Some(Self::Res),
            "ERR" => Some(Self::Err),
            "EVT" => Some(Self::Evt),
            _ => None,
        }
    }

    /// Header token for this kind
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ping => "PING",
            Self::Pong => "PONG",
            Self::Cmd => "CMD",
            Self::Res => "RES",
            Self::Err => "ERR",
            Self::Evt => "EVT",
        }
    }

    /// Whether the header carries a key and a length-prefixed body
    #[must_use]
    pub const fn carries_body(self) -> bool {
        !matches!(self, Self::Ping | Self::Pong)
    }

    /// Whether the key field is a correlation id (as opposed to a topic)
    #[must_use]
    pub const fn is_correlated(self) -> bool {
        matches!(self, Self::Cmd | Self::Res | Self::Err)
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
