//! Error types for the chat client.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for chat operations.
pub type ChatResult<T> = Result<T, ChatError>;

/// Errors that can occur while configuring or running an exchange.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Server reported an error: {0}")]
    ServerReported(String),

    #[error("Request timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),

    #[error("Message is empty")]
    EmptyMessage,

    #[error("An exchange is already in progress: {0}")]
    ExchangeInProgress(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Transport-class failure categories that terminate an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    TransportUnavailable,
    Protocol,
    ServerReported,
    Timeout,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::TransportUnavailable => "transport unavailable",
            Self::Protocol => "protocol error",
            Self::ServerReported => "server error",
            Self::Timeout => "timeout",
        };
        f.write_str(label)
    }
}

/// Why an exchange ended in failure, as carried by a terminal error event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl ExchangeFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Protocol, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(FailureKind::ServerReported, message)
    }
}

impl fmt::Display for ExchangeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl From<&ChatError> for ExchangeFailure {
    fn from(err: &ChatError) -> Self {
        match err {
            ChatError::TransportUnavailable(msg) => {
                Self::new(FailureKind::TransportUnavailable, msg.clone())
            }
            ChatError::ServerReported(msg) => Self::server(msg.clone()),
            ChatError::Timeout(_) => Self::new(FailureKind::Timeout, err.to_string()),
            ChatError::Protocol(msg) => Self::protocol(msg.clone()),
            other => Self::protocol(other.to_string()),
        }
    }
}

impl From<ChatError> for ExchangeFailure {
    fn from(err: ChatError) -> Self {
        Self::from(&err)
    }
}
