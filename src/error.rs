// Error types for apihost.
// Covers cache construction, remote fetches, filesystem access and dispatch failures.

use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HostError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Cache path {0} is taken by a file that is not a directory, remove it manually")]
    Conflict(PathBuf),

    #[error("Unsupported protocol {0}")]
    UnsupportedProtocol(String),

    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Remote responded with status {0}")]
    RemoteStatus(u16),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("request time out after {} ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Invalid arguments for {operation}: {reason}")]
    InvalidArguments { operation: String, reason: String },

    #[error("Operation task failed: {0}")]
    TaskFailed(String),
}

impl HostError {
    /// Render the error as a reply payload for the peer.
    ///
    /// Remote status failures travel as the bare status code so the peer can
    /// branch on it; everything else is flattened to its message.
    pub fn reply_value(&self) -> Value {
        match self {
            HostError::RemoteStatus(code) => Value::from(*code),
            other => Value::String(other.to_string()),
        }
    }

    pub fn invalid_arguments(operation: impl Into<String>, reason: impl ToString) -> Self {
        HostError::InvalidArguments {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HostError>;
