//! Core types for the chat client.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ExchangeFailure;

/// Text shown in the assistant message until the first update arrives.
pub const PLACEHOLDER_TEXT: &str = "Thinking...";

/// Identifier of one request/response exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExchangeId(Uuid);

impl ExchangeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ExchangeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Message role in a conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A tool invocation reported by the assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    pub input: String,
    pub output: String,
}

/// Extra information attached to streamed updates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamMetadata {
    /// Retrieved study material the answer was grounded on
    #[serde(rename = "ragContext", default, skip_serializing_if = "Option::is_none")]
    pub rag_context: Option<String>,
    /// Tools the assistant invoked
    #[serde(rename = "toolCalls", default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl StreamMetadata {
    pub fn is_empty(&self) -> bool {
        self.rag_context.is_none() && self.tool_calls.is_empty()
    }
}

/// A single chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// Unique message ID (UUID)
    pub id: String,
    /// Role of the message sender
    pub role: MessageRole,
    /// Full current text; replaced wholesale on every update
    pub content: String,
    /// When the message was created
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    /// Still showing the placeholder text
    #[serde(rename = "isPlaceholder", default)]
    pub is_placeholder: bool,
    /// Exchange this message belongs to
    #[serde(rename = "exchangeId", skip_serializing_if = "Option::is_none")]
    pub exchange_id: Option<ExchangeId>,
    /// Latest metadata received for an assistant message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<StreamMetadata>,
}

impl ChatMessage {
    fn new(role: MessageRole, content: String, exchange_id: Option<ExchangeId>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            created_at: Utc::now(),
            is_placeholder: false,
            exchange_id,
            metadata: None,
        }
    }

    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content.into(), None)
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content.into(), None)
    }

    /// Create the placeholder assistant message for an exchange
    pub fn placeholder(exchange_id: ExchangeId) -> Self {
        let mut message = Self::new(
            MessageRole::Assistant,
            PLACEHOLDER_TEXT.to_string(),
            Some(exchange_id),
        );
        message.is_placeholder = true;
        message
    }

    pub fn with_exchange(mut self, exchange_id: ExchangeId) -> Self {
        self.exchange_id = Some(exchange_id);
        self
    }
}

/// Outbound request for one exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>, context: Option<String>) -> Self {
        Self {
            message: message.into(),
            context,
        }
    }
}

/// One update in the lifecycle of an exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Partial response: the new text and everything received so far
    Chunk {
        delta: String,
        aggregate: String,
        metadata: Option<StreamMetadata>,
    },
    /// Successful completion with the final text
    End {
        aggregate: String,
        metadata: Option<StreamMetadata>,
    },
    /// Failure; closes the exchange
    Error(ExchangeFailure),
}

impl StreamEvent {
    pub fn chunk(delta: impl Into<String>, aggregate: impl Into<String>) -> Self {
        Self::Chunk {
            delta: delta.into(),
            aggregate: aggregate.into(),
            metadata: None,
        }
    }

    pub fn end(aggregate: impl Into<String>) -> Self {
        Self::End {
            aggregate: aggregate.into(),
            metadata: None,
        }
    }

    /// `End` and `Error` close an exchange.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::End { .. } | Self::Error(_))
    }

    pub fn metadata(&self) -> Option<&StreamMetadata> {
        match self {
            Self::Chunk { metadata, .. } | Self::End { metadata, .. } => metadata.as_ref(),
            Self::Error(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let msg = ChatMessage::user("What is abstract reasoning?");
        assert_eq!(msg.role, MessageRole::User);
        assert!(!msg.is_placeholder);

        let exchange = ExchangeId::new();
        let msg = ChatMessage::placeholder(exchange);
        assert_eq!(msg.role, MessageRole::Assistant);
        assert_eq!(msg.content, PLACEHOLDER_TEXT);
        assert!(msg.is_placeholder);
        assert_eq!(msg.exchange_id, Some(exchange));
    }

    #[test]
    fn test_request_omits_missing_context() {
        let json = serde_json::to_string(&ChatRequest::new("hi", None)).unwrap();
        assert_eq!(json, r#"{"message":"hi"}"#);

        let json = serde_json::to_string(&ChatRequest::new("hi", Some("ch. 3".into()))).unwrap();
        assert_eq!(json, r#"{"message":"hi","context":"ch. 3"}"#);
    }

    #[test]
    fn test_terminal_events() {
        assert!(!StreamEvent::chunk("a", "a").is_terminal());
        assert!(StreamEvent::end("a").is_terminal());
        assert!(StreamEvent::Error(ExchangeFailure::protocol("x")).is_terminal());
    }
}
