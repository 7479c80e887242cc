//! Chat platform sinks
//!
//! The chat platform SDK lives outside this crate; the relay talks to it
//! through [`ChatSink`].

mod memory;
mod tracing_sink;

pub use memory::{MemorySink, SinkRecord};
pub use tracing_sink::TracingSink;

use async_trait::async_trait;
use bridge_common::AppResult;

/// Outbound side of the chat platform
#[async_trait]
pub trait ChatSink: Send + Sync {
    /// Post `text` to `channel`, or to the default channel when `None`
    async fn post_message(&self, channel: Option<&str>, text: &str) -> AppResult<()>;

    /// Show `status` as the bot's presence
    async fn update_presence(&self, status: &str) -> AppResult<()>;

    /// Rename a channel used as a status board
    async fn rename_channel(&self, channel: &str, name: &str) -> AppResult<()> {
        let _ = (channel, name);
        Ok(())
    }
}
