// Chat session data models

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(ChatRole::User),
            "assistant" => Some(ChatRole::Assistant),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub content: String,
    pub role: ChatRole,
    /// Epoch milliseconds
    pub timestamp: i64,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            role,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }
}

/// Conversation over one summary
///
/// The summary context is fixed at creation and messages can only be
/// appended, so a restored session always replays the same prompt prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    context: Option<String>,
    pub timestamp: i64,
}

impl ChatSession {
    pub fn new(title: impl Into<String>, context: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            messages: Vec::new(),
            context,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Rebuild a session loaded from storage
    pub fn restore(
        id: String,
        title: String,
        context: Option<String>,
        messages: Vec<ChatMessage>,
        timestamp: i64,
    ) -> Self {
        Self { id, title, messages, context, timestamp }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn push_message(&mut self, message: ChatMessage) {
        self.timestamp = message.timestamp.max(self.timestamp);
        self.messages.push(message);
    }
}
