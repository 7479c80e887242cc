//! Inbound events

use crate::protocol::Topic;
use bytes::Bytes;
use chrono::{DateTime, Utc};

/// An event pushed by the peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Topic the peer published under
    pub topic: Topic,
    /// Raw event body
    pub body: Bytes,
    /// When the frame was read off the socket
    pub received_at: DateTime<Utc>,
}

impl Event {
    /// Create an event stamped with the current time
    pub fn new(topic: impl Into<Topic>, body: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            body: body.into(),
            received_at: Utc::now(),
        }
    }

    /// Body as text, replacing invalid UTF-8
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
