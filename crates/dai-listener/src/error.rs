//! Error types for the DAI listener.
//!
//! Every collaborator call returns a [`ListenerError`]. The discovery loop and
//! the run watchers decide what to do with an error by its kind: transport and
//! API failures are logged and the current tick or watcher ends, while
//! configuration errors are fatal at startup.

use std::time::Duration;
use thiserror::Error;

/// Errors raised by the listener and its REST collaborators.
#[derive(Error, Debug)]
pub enum ListenerError {
    /// Connection failure or request timeout.
    #[error("Failed to {operation}: {message}")]
    Transport { operation: String, message: String },

    /// Token request failed, or the refreshed token was rejected.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Non-success HTTP status.
    #[error("Failed to {operation} ({status}): {body}")]
    Api {
        operation: String,
        status: u16,
        body: String,
    },

    /// Response body did not have the expected shape.
    #[error("Failed to decode response for {operation}: {message}")]
    Decode { operation: String, message: String },

    /// Named model, testcase or group does not exist.
    #[error("Lookup error: {0}")]
    Lookup(String),

    /// Missing or invalid configuration or mapping file.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Run did not reach a terminal status before the configured ceiling.
    #[error("Timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),
}

impl ListenerError {
    pub(crate) fn transport(operation: &str, err: reqwest::Error) -> Self {
        ListenerError::Transport {
            operation: operation.to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn decode(operation: &str, err: impl std::fmt::Display) -> Self {
        ListenerError::Decode {
            operation: operation.to_string(),
            message: err.to_string(),
        }
    }

    /// Whether a later attempt at the same call could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ListenerError::Transport { .. } => true,
            ListenerError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Short name of the error kind, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            ListenerError::Transport { .. } => "transport",
            ListenerError::Auth(_) => "auth",
            ListenerError::Api { .. } => "api",
            ListenerError::Decode { .. } => "decode",
            ListenerError::Lookup(_) => "lookup",
            ListenerError::Config(_) => "config",
            ListenerError::Timeout(_) => "timeout",
        }
    }
}

/// Result type alias using ListenerError.
pub type Result<T> = std::result::Result<T, ListenerError>;
