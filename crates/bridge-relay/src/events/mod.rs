//! Event routing
//!
//! Routes bridge events to the chat platform by topic.

mod format;
mod router;

pub use format::{clean_chat_line, status_channel_name, MAX_CHANNEL_NAME_LEN};
pub use router::{EventRouter, RouteTargets, Routed};
