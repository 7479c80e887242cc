//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file if present).

use crate::telemetry::TracingConfig;
use bridge_client::ClientOptions;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub bridge: BridgeConfig,
    pub relay: RelaySettings,
}

/// General application settings
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub name: String,
    pub env: Environment,
    /// Force JSON log output regardless of environment
    pub log_json: Option<bool>,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// Where the bridge peer lives and how to talk to it
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// `host:port` of the game-server bridge
    pub addr: String,
    pub options: ClientOptions,
}

/// Chat relay settings
#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// Prefix prepended to chat lines relayed into the game
    pub chat_prefix: String,
    /// Channel that receives chat and lifecycle events
    pub channel_id: Option<String>,
    /// Channel that receives status updates
    pub status_channel_id: Option<String>,
}

// Default value functions
fn default_app_name() -> String {
    "bridge-relay".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_chat_prefix() -> String {
    "[Discord]".to_string()
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if `BRIDGE_ADDR` is missing or a value does not parse
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let env = match vars.get("APP_ENV") {
            Some(value) => Environment::parse(&value)
                .ok_or(ConfigError::InvalidValue("APP_ENV", value))?,
            None => default_env(),
        };

        let app = AppSettings {
            name: vars.get("APP_NAME").unwrap_or_else(default_app_name),
            env,
            log_json: vars.parse("LOG_JSON")?,
        };

        let addr = vars
            .get("BRIDGE_ADDR")
            .filter(|addr| !addr.trim().is_empty())
            .ok_or(ConfigError::MissingVar("BRIDGE_ADDR"))?;

        let d = ClientOptions::default();
        let options = ClientOptions {
            dial_timeout: vars.millis("BRIDGE_DIAL_TIMEOUT_MS", d.dial_timeout)?,
            read_timeout: vars.millis("BRIDGE_READ_TIMEOUT_MS", d.read_timeout)?,
            write_timeout: vars.millis("BRIDGE_WRITE_TIMEOUT_MS", d.write_timeout)?,
            heartbeat_interval: vars.millis("BRIDGE_HEARTBEAT_INTERVAL_MS", d.heartbeat_interval)?,
            heartbeat_timeout: vars.millis("BRIDGE_HEARTBEAT_TIMEOUT_MS", d.heartbeat_timeout)?,
            heartbeat_misses: vars.parse("BRIDGE_HEARTBEAT_MISSES")?.unwrap_or(d.heartbeat_misses),
            reconnect_base_backoff: vars.millis("BRIDGE_BACKOFF_BASE_MS", d.reconnect_base_backoff)?,
            reconnect_max_backoff: vars.millis("BRIDGE_BACKOFF_MAX_MS", d.reconnect_max_backoff)?,
            reconnect_jitter: vars.millis("BRIDGE_BACKOFF_JITTER_MS", d.reconnect_jitter)?,
            flap_threshold: vars.millis("BRIDGE_FLAP_THRESHOLD_MS", d.flap_threshold)?,
            command_timeout: vars.millis("BRIDGE_COMMAND_TIMEOUT_MS", d.command_timeout)?,
            breaker_failures: vars.parse("BRIDGE_BREAKER_FAILURES")?.unwrap_or(d.breaker_failures),
            breaker_open_for: vars.millis("BRIDGE_BREAKER_OPEN_MS", d.breaker_open_for)?,
            write_queue_capacity: vars.parse("BRIDGE_WRITE_QUEUE")?.unwrap_or(d.write_queue_capacity),
            default_subscriber_buffer: vars
                .parse("BRIDGE_SUBSCRIBER_BUFFER")?
                .unwrap_or(d.default_subscriber_buffer),
            max_body: vars.parse("BRIDGE_MAX_BODY")?.unwrap_or(d.max_body),
            shutdown_grace: vars.millis("BRIDGE_SHUTDOWN_GRACE_MS", d.shutdown_grace)?,
        }
        .normalized();

        let relay = RelaySettings {
            chat_prefix: vars
                .get("RELAY_CHAT_PREFIX")
                .unwrap_or_else(default_chat_prefix),
            channel_id: vars.get("RELAY_CHANNEL_ID"),
            status_channel_id: vars.get("RELAY_STATUS_CHANNEL_ID"),
        };

        Ok(Self {
            app,
            bridge: BridgeConfig { addr, options },
            relay,
        })
    }

    /// Tracing setup matching the environment
    #[must_use]
    pub fn tracing_config(&self) -> TracingConfig {
        let config = match self.app.env {
            Environment::Production => TracingConfig::production(),
            Environment::Development => TracingConfig::development(),
            Environment::Staging => TracingConfig::default(),
        };
        match self.app.log_json {
            Some(json) => config.with_json(json),
            None => config,
        }
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
    }

    fn parse<T: FromStr>(&self, key: &'static str) -> Result<Option<T>, ConfigError> {
        match self.get(key) {
            Some(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::InvalidValue(key, raw)),
            None => Ok(None),
        }
    }

    fn millis(&self, key: &'static str, default: Duration) -> Result<Duration, ConfigError> {
        Ok(self
            .parse::<u64>(key)?
            .map_or(default, Duration::from_millis))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
