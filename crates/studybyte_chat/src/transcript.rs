//! Conversation transcripts.
//!
//! A transcript is the message list of one session written as pretty JSON.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ChatResult;
use crate::types::{ChatMessage, MessageRole};

/// Serializable snapshot of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    /// When the snapshot was taken
    #[serde(rename = "savedAt")]
    pub saved_at: DateTime<Utc>,
    pub messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            saved_at: Utc::now(),
            messages,
        }
    }

    /// Write the transcript, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> ChatResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        debug!("Saved {} messages to {:?}", self.messages.len(), path);
        Ok(())
    }

    pub fn load(path: &Path) -> ChatResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Number of completed user/assistant turns.
    pub fn turns(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role == MessageRole::Assistant && !m.is_placeholder)
            .count()
    }
}
