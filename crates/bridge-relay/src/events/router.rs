//! Event router

use super::{clean_chat_line, status_channel_name};
use crate::sink::ChatSink;
use bridge_client::{Event, Subscription, Topic};
use bridge_common::AppResult;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Where routed events end up
#[derive(Debug, Clone, Default)]
pub struct RouteTargets {
    /// Channel for chat, join/leave and lifecycle lines (sink default when `None`)
    pub channel_id: Option<String>,
    /// Channel renamed to the latest status
    pub status_channel_id: Option<String>,
}

/// What happened to an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    Message(String),
    Presence(String),
    Ignored,
}

/// Forwards bridge events to a [`ChatSink`]
pub struct EventRouter {
    sink: Arc<dyn ChatSink>,
    targets: RouteTargets,
}

impl EventRouter {
    pub fn new(sink: Arc<dyn ChatSink>, targets: RouteTargets) -> Self {
        Self { sink, targets }
    }

    /// Route a single event
    pub async fn route(&self, event: &Event) -> AppResult<Routed> {
        let text = event.text();
        let channel = self.targets.channel_id.as_deref();

        match &event.topic {
            Topic::Chat => {
                let line = clean_chat_line(&text);
                if line.is_empty() {
                    return Ok(Routed::Ignored);
                }
                self.sink.post_message(channel, &line).await?;
                Ok(Routed::Message(line))
            }
            Topic::Join | Topic::Leave | Topic::Lifecycle => {
                let line = text.trim().to_string();
                if line.is_empty() {
                    return Ok(Routed::Ignored);
                }
                self.sink.post_message(channel, &line).await?;
                Ok(Routed::Message(line))
            }
            Topic::Status => {
                let status = text.trim().to_string();
                self.sink.update_presence(&status).await?;
                if let Some(status_channel) = self.targets.status_channel_id.as_deref() {
                    self.sink
                        .rename_channel(status_channel, &status_channel_name(&status))
                        .await?;
                }
                Ok(Routed::Presence(status))
            }
            Topic::Command | Topic::Other(_) => {
                tracing::debug!(topic = %event.topic, "No route for event");
                Ok(Routed::Ignored)
            }
        }
    }

    /// Route events until `cancel` fires or the subscription closes.
    ///
    /// Sink failures are logged and do not stop the loop. Returns the number
    /// of events delivered to the sink.
    pub async fn run(self, mut subscription: Subscription, cancel: CancellationToken) -> usize {
        let mut delivered = 0;
        tracing::info!(subscription_id = subscription.id(), "Event router started");

        loop {
            let event = tokio::select! {
                () = cancel.cancelled() => break,
                event = subscription.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            match self.route(&event).await {
                Ok(Routed::Ignored) => {}
                Ok(_) => delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        topic = %event.topic,
                        error = %e,
                        code = e.error_code(),
                        "Failed to deliver event"
                    );
                }
            }
        }

        subscription.cancel();
        tracing::info!(delivered = delivered, "Event router stopped");
        delivered
    }
}

impl std::fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRouter")
            .field("targets", &self.targets)
            .finish()
    }
}
