//! Wire formats for the streaming channel and the fallback endpoint.
//!
//! The streaming channel carries one JSON object per text frame:
//!
//! ```text
//! client → {"message": "...", "context": "..."}
//! server → {"type": "stream", "content": delta, "full_content": aggregate, "metadata": {...}}
//! server → {"type": "end", "content": aggregate, "metadata": {...}}
//! server → {"type": "error", "content": reason}
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ChatError, ChatResult, ExchangeFailure};
use crate::types::{StreamEvent, StreamMetadata};

/// A frame sent by the server on the streaming channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerFrame {
    Stream {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        full_content: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<StreamMetadata>,
    },
    End {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<StreamMetadata>,
    },
    Error {
        content: String,
    },
}

/// Successful body of the fallback endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackResponse {
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Failure body of the fallback endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

/// Body of the health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub message: String,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Turns server frames into [`StreamEvent`]s, tracking the running aggregate.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    aggregate: String,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text accumulated so far.
    pub fn aggregate(&self) -> &str {
        &self.aggregate
    }

    /// Decode one text frame. Anything that is not a known frame is a
    /// protocol error.
    pub fn decode(&mut self, text: &str) -> ChatResult<StreamEvent> {
        let frame: ServerFrame = serde_json::from_str(text)
            .map_err(|e| ChatError::Protocol(format!("malformed frame: {}", e)))?;
        Ok(self.apply(frame))
    }

    /// Convert an already parsed frame.
    pub fn apply(&mut self, frame: ServerFrame) -> StreamEvent {
        match frame {
            ServerFrame::Stream {
                content,
                full_content,
                metadata,
            } => {
                // Older servers omit full_content; rebuild it from the deltas.
                self.aggregate = match full_content {
                    Some(full) => full,
                    None => format!("{}{}", self.aggregate, content),
                };
                debug!(delta = content.len(), aggregate = self.aggregate.len(), "stream frame");
                StreamEvent::Chunk {
                    delta: content,
                    aggregate: self.aggregate.clone(),
                    metadata: non_empty(metadata),
                }
            }
            ServerFrame::End { content, metadata } => {
                // An empty end frame must not wipe what was streamed.
                if !content.is_empty() || self.aggregate.is_empty() {
                    self.aggregate = content;
                }
                debug!(aggregate = self.aggregate.len(), "end frame");
                StreamEvent::End {
                    aggregate: self.aggregate.clone(),
                    metadata: non_empty(metadata),
                }
            }
            ServerFrame::Error { content } => {
                debug!(reason = %content, "error frame");
                StreamEvent::Error(ExchangeFailure::server(content))
            }
        }
    }
}

fn non_empty(metadata: Option<StreamMetadata>) -> Option<StreamMetadata> {
    metadata.filter(|m| !m.is_empty())
}

/// Interpret a fallback endpoint response given its status code and body.
pub fn interpret_fallback_response(status: u16, body: &str) -> ChatResult<FallbackResponse> {
    if (200..300).contains(&status) {
        return serde_json::from_str(body)
            .map_err(|e| ChatError::Protocol(format!("unexpected response body: {}", e)));
    }

    let detail = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .map(|e| e.detail)
        .filter(|detail| !detail.is_empty())
        .unwrap_or_else(|| format!("Server error: {}", status));
    Err(ChatError::ServerReported(detail))
}
