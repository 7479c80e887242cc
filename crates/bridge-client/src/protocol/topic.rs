//! Event topics
//!
//! Topics are free-form on the wire; the well-known ones get their own variant.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Topic of an EVT frame
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// In-game chat line
    Chat,
    /// Periodic server status (TPS, player count)
    Status,
    /// A player joined
    Join,
    /// A player left
    Leave,
    /// Server lifecycle (starting, stopping)
    Lifecycle,
    /// Output of a command run on the server
    Command,
    /// Any topic this client has no variant for
    Other(String),
}

impl Topic {
    /// Wire name of the topic
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Chat => "chat",
            Self::Status => "status",
            Self::Join => "join",
            Self::Leave => "leave",
            Self::Lifecycle => "lifecycle",
            Self::Command => "command",
            Self::Other(name) => name,
        }
    }

    /// Map a wire name onto a topic
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name {
            "chat" => Self::Chat,
            "status" => Self::Status,
            "join" => Self::Join,
            "leave" => Self::Leave,
            "lifecycle" => Self::Lifecycle,
            "command" => Self::Command,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<&str> for Topic {
    fn from(name: &str) -> Self {
        Self::parse(name)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Topic {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Topic {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Ok(Self::parse(&name))
    }
}
