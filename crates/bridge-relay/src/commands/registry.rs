//! Command dispatch table
//!
//! Maps operator-facing command names to the payload sent over the bridge.
//! Built once by the application root and handed to whoever dispatches.

use bridge_client::BridgeClient;
use bridge_common::{AppError, AppResult};
use std::collections::BTreeMap;
use std::fmt;

/// How many arguments a command takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    fn accepts(self, count: usize) -> bool {
        match self {
            Self::Exact(n) => count == n,
            Self::AtLeast(n) => count >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(1) => f.write_str("exactly 1 argument"),
            Self::Exact(n) => write!(f, "exactly {n} arguments"),
            Self::AtLeast(1) => f.write_str("at least 1 argument"),
            Self::AtLeast(n) => write!(f, "at least {n} arguments"),
        }
    }
}

/// One entry in the dispatch table
///
/// `template` is split on spaces; `{N}` is replaced by argument `N` and `{*}`
/// by all arguments joined with a space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: String,
    pub usage: String,
    pub description: String,
    pub arity: Arity,
    pub template: String,
}

impl CommandSpec {
    pub fn new(
        name: impl Into<String>,
        arity: Arity,
        template: impl Into<String>,
        usage: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            usage: usage.into(),
            description: description.into(),
            arity,
            template: template.into(),
        }
    }

    /// Build the bridge payload for `args`
    pub fn render<S: AsRef<str>>(&self, args: &[S]) -> AppResult<String> {
        if !self.arity.accepts(args.len()) {
            return Err(AppError::invalid_arguments(format!(
                "{} takes {}, got {} (usage: {})",
                self.name,
                self.arity,
                args.len(),
                self.usage
            )));
        }
        if let Some(blank) = args.iter().position(|a| a.as_ref().trim().is_empty()) {
            return Err(AppError::invalid_arguments(format!(
                "{}: argument {} is empty",
                self.name,
                blank + 1
            )));
        }

        let mut parts = Vec::new();
        for token in self.template.split(' ') {
            match token {
                "{*}" => parts.extend(args.iter().map(|a| a.as_ref().trim())),
                _ => match placeholder(token) {
                    Some(index) => {
                        let arg = args.get(index).ok_or_else(|| {
                            AppError::invalid_arguments(format!(
                                "{}: missing argument {}",
                                self.name,
                                index + 1
                            ))
                        })?;
                        parts.push(arg.as_ref().trim());
                    }
                    None => parts.push(token),
                },
            }
        }
        Ok(parts.join(" "))
    }
}

fn placeholder(token: &str) -> Option<usize> {
    token
        .strip_prefix('{')
        .and_then(|t| t.strip_suffix('}'))
        .and_then(|n| n.parse().ok())
}

/// Dispatch table of commands the relay may send
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    commands: BTreeMap<String, CommandSpec>,
}

impl CommandRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the commands the game-server mod understands
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for spec in [
            CommandSpec::new(
                "whitelist",
                Arity::Exact(1),
                "whitelist add {0}",
                "whitelist <player>",
                "Add a player to the server whitelist",
            ),
            CommandSpec::new(
                "unwhitelist",
                Arity::Exact(1),
                "unwhitelist {0}",
                "unwhitelist <player>",
                "Remove a player from the server whitelist",
            ),
            CommandSpec::new(
                "kick",
                Arity::Exact(1),
                "kick {0}",
                "kick <player>",
                "Kick a player from the server",
            ),
            CommandSpec::new(
                "commandexec",
                Arity::AtLeast(1),
                "commandexec {*}",
                "commandexec <command...>",
                "Run a server console command and return its output",
            ),
            CommandSpec::new(
                "say",
                Arity::AtLeast(1),
                "say {*}",
                "say <text...>",
                "Broadcast a chat line in game",
            ),
        ] {
            registry.register(spec);
        }
        registry
    }

    /// Add or replace a command, returning the one it replaced
    pub fn register(&mut self, spec: CommandSpec) -> Option<CommandSpec> {
        self.commands.insert(spec.name.clone(), spec)
    }

    /// Look up a command
    pub fn get(&self, name: &str) -> Option<&CommandSpec> {
        self.commands.get(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    /// All commands, sorted by name
    pub fn specs(&self) -> impl Iterator<Item = &CommandSpec> {
        self.commands.values()
    }

    /// Render the bridge payload for `name` with `args`
    pub fn render<S: AsRef<str>>(&self, name: &str, args: &[S]) -> AppResult<String> {
        self.get(name)
            .ok_or_else(|| AppError::UnknownCommand(name.to_string()))?
            .render(args)
    }

    /// Render and send a command, returning the peer's reply as text
    pub async fn execute<S: AsRef<str>>(
        &self,
        client: &BridgeClient,
        name: &str,
        args: &[S],
    ) -> AppResult<String> {
        let payload = self.render(name, args)?;
        tracing::debug!(command = %name, payload = %payload, "Dispatching command");

        let reply = client.send(payload).await?;
        Ok(String::from_utf8_lossy(&reply).into_owned())
    }
}
