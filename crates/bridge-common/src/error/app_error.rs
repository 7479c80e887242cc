//! Application error types
//!
//! Unified error handling for the relay application.

use crate::config::ConfigError;
use bridge_client::BridgeError;
use serde::Serialize;
use std::fmt;

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    // Bridge errors
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    // Command dispatch errors
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    // Chat sink errors
    #[error("Chat sink error: {0}")]
    Sink(String),

    // Internal errors
    #[error("Internal error")]
    Internal(#[source] anyhow::Error),
}

impl AppError {
    /// Get error code for logs and operator output
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Bridge(e) => e.error_code(),
            Self::UnknownCommand(_) => "UNKNOWN_COMMAND",
            Self::InvalidArguments(_) => "INVALID_ARGUMENTS",
            Self::Sink(_) => "SINK_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the operator caused this (bad command or arguments)
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::UnknownCommand(_) | Self::InvalidArguments(_))
    }

    /// Whether retrying the same action later may succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Bridge(e) => e.is_retryable(),
            Self::Sink(_) => true,
            _ => false,
        }
    }

    /// Process exit code for fatal errors
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 78,
            _ => 1,
        }
    }

    /// Create an invalid arguments error
    #[must_use]
    pub fn invalid_arguments(msg: impl fmt::Display) -> Self {
        Self::InvalidArguments(msg.to_string())
    }

    /// Create an internal error from any error
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }
}

/// Error summary for structured output
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.error_code().to_string(),
            message: err.to_string(),
            details: None,
        }
    }
}

impl From<AppError> for ErrorResponse {
    fn from(err: AppError) -> Self {
        Self::from(&err)
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
