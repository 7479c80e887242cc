//! Relay state
//!
//! The application root: owns the bridge client, the command table and the
//! chat sink, and is passed by reference to everything that needs them.

use crate::action::ActionId;
use crate::commands::{CommandRegistry, OperatorInput};
use crate::events::{EventRouter, RouteTargets};
use crate::sink::ChatSink;
use bridge_client::BridgeClient;
use bridge_common::{AppError, AppResult, RelaySettings};
use std::fmt::Write as _;
use std::sync::Arc;

/// Relay application state
#[derive(Clone)]
pub struct Relay {
    /// Bridge to the game server
    client: Arc<BridgeClient>,
    /// Commands the relay may send
    commands: Arc<CommandRegistry>,
    /// Outbound side of the chat platform
    sink: Arc<dyn ChatSink>,
    /// Relay settings
    settings: Arc<RelaySettings>,
}

impl Relay {
    /// Create a new relay
    pub fn new(
        client: Arc<BridgeClient>,
        commands: CommandRegistry,
        sink: Arc<dyn ChatSink>,
        settings: RelaySettings,
    ) -> Self {
        Self {
            client,
            commands: Arc::new(commands),
            sink,
            settings: Arc::new(settings),
        }
    }

    /// Get the bridge client
    pub fn client(&self) -> &BridgeClient {
        &self.client
    }

    /// Get the command table
    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    /// Get the chat sink
    pub fn sink(&self) -> &dyn ChatSink {
        self.sink.as_ref()
    }

    /// Get the relay settings
    pub fn settings(&self) -> &RelaySettings {
        &self.settings
    }

    /// Router that forwards bridge events to this relay's sink
    pub fn event_router(&self) -> EventRouter {
        EventRouter::new(
            Arc::clone(&self.sink),
            RouteTargets {
                channel_id: self.settings.channel_id.clone(),
                status_channel_id: self.settings.status_channel_id.clone(),
            },
        )
    }

    /// Run a registered command on the game server
    pub async fn dispatch<S: AsRef<str>>(&self, name: &str, args: &[S]) -> AppResult<String> {
        self.commands.execute(&self.client, name, args).await
    }

    /// Relay a chat line into the game, prefixed with the configured tag
    pub async fn relay_chat(&self, text: &str) -> AppResult<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        self.dispatch("say", &[self.settings.chat_prefix.as_str(), text])
            .await
            .map(|_| ())
    }

    /// Handle a button click carrying an encoded [`ActionId`]
    ///
    /// Returns the game server's reply when the action sent a command.
    pub async fn handle_action(&self, raw_id: &str) -> AppResult<Option<String>> {
        let action = ActionId::parse(raw_id).map_err(AppError::invalid_arguments)?;
        tracing::info!(
            action = %action.kind,
            subject = %action.subject,
            requester = %action.requester,
            "Handling action"
        );

        match action.command() {
            Some((name, args)) => self.dispatch(name, args.as_slice()).await.map(Some),
            None => Ok(None),
        }
    }

    /// Handle one operator input line; returns text to show the operator
    pub async fn handle_input(&self, line: &str) -> AppResult<Option<String>> {
        match OperatorInput::parse(line) {
            OperatorInput::Empty => Ok(None),
            OperatorInput::Chat(text) => {
                self.relay_chat(&text).await?;
                Ok(None)
            }
            OperatorInput::Command { name, args } => match name.as_str() {
                "help" => Ok(Some(self.help())),
                "status" => {
                    let status = serde_json::to_string_pretty(&self.client.status())
                        .map_err(AppError::internal)?;
                    Ok(Some(status))
                }
                _ => self.dispatch(&name, args.as_slice()).await.map(Some),
            },
        }
    }

    fn help(&self) -> String {
        let mut out = String::from("Commands:\n  /help\n  /status\n");
        for spec in self.commands.specs() {
            let _ = writeln!(out, "  /{:<28} {}", spec.usage, spec.description);
        }
        out
    }
}

impl std::fmt::Debug for Relay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relay")
            .field("client", &self.client)
            .field("commands", &self.commands.names().collect::<Vec<_>>())
            .field("settings", &self.settings)
            .finish()
    }
}
