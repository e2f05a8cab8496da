//! Conversation data model.
//!
//! Sessions are append-only message logs; the only mutation a stored
//! message ever sees is its feedback flag. The session store in the app
//! crate is the sole owner of the collection.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::attachment::Attachment;

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// Thumbs up / thumbs down on a model response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    Like,
    Dislike,
}

/// Web or maps citation attached to a grounded response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingChunk {
    pub uri: String,
    pub title: String,
}

/// Citations the backend attached to a response, split by tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub search_chunks: Vec<GroundingChunk>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub map_chunks: Vec<GroundingChunk>,
}

impl GroundingMetadata {
    pub fn is_empty(&self) -> bool {
        self.search_chunks.is_empty() && self.map_chunks.is_empty()
    }
}

/// A single chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub text: String,
    /// Unix milliseconds.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grounding_metadata: Option<GroundingMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::User,
            text: text.into(),
            timestamp: now_millis(),
            attachments,
            grounding_metadata: None,
            feedback: None,
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Model,
            text: text.into(),
            timestamp: now_millis(),
            attachments: Vec::new(),
            grounding_metadata: None,
            feedback: None,
        }
    }

    /// Tri-state feedback: setting the current value again clears it.
    pub fn toggle_feedback(&mut self, feedback: Feedback) {
        if self.feedback == Some(feedback) {
            self.feedback = None;
        } else {
            self.feedback = Some(feedback);
        }
    }
}

/// Title given to sessions before the first user message arrives.
pub const NEW_CHAT_TITLE: &str = "New Chat";

/// Fallback title for a first message that carries only attachments.
pub const ATTACHMENT_ONLY_TITLE: &str = "Image Query";

/// One independent conversation thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    /// Unix milliseconds.
    pub created_at: i64,
    /// Unix milliseconds, bumped on every message mutation.
    pub last_modified: i64,
}

impl ChatSession {
    pub fn new() -> Self {
        let now = now_millis();
        Self {
            id: Uuid::new_v4().to_string(),
            title: NEW_CHAT_TITLE.to_string(),
            messages: Vec::new(),
            created_at: now,
            last_modified: now,
        }
    }

    /// Append a message, deriving the title from the first user message.
    pub fn push_message(&mut self, msg: ChatMessage) {
        if self.messages.is_empty() && msg.role == Role::User {
            let head: String = msg.text.chars().take(30).collect();
            self.title = if head.is_empty() {
                ATTACHMENT_ONLY_TITLE.to_string()
            } else {
                head
            };
        }
        self.messages.push(msg);
        self.last_modified = now_millis();
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
