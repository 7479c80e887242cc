//! Log-only sink

use super::ChatSink;
use async_trait::async_trait;
use bridge_common::AppResult;

/// Sink that writes everything to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

#[async_trait]
impl ChatSink for TracingSink {
    async fn post_message(&self, channel: Option<&str>, text: &str) -> AppResult<()> {
        tracing::info!(channel = channel.unwrap_or("default"), text = %text, "Chat message");
        Ok(())
    }

    async fn update_presence(&self, status: &str) -> AppResult<()> {
        tracing::info!(status = %status, "Presence update");
        Ok(())
    }

    async fn rename_channel(&self, channel: &str, name: &str) -> AppResult<()> {
        tracing::info!(channel = %channel, name = %name, "Channel rename");
        Ok(())
    }
}
