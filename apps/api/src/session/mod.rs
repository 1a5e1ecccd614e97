//! Conversation state for one user, keyed by an opaque session id.

pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of the conversation as persisted to disk: `{role, content, at}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub at: DateTime<Utc>,
}

/// Ordered multi-turn history, earliest to latest. Order is significant:
/// the extractor resolves conflicting field mentions by preferring the
/// latest message.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Session {
    pub messages: Vec<ChatMessage>,
}

impl Session {
    pub fn push_user(&mut self, content: &str) {
        self.push(Role::User, content);
    }

    pub fn push_assistant(&mut self, content: &str) {
        self.push(Role::Assistant, content);
    }

    fn push(&mut self, role: Role, content: &str) {
        self.messages.push(ChatMessage {
            role,
            content: content.to_string(),
            at: Utc::now(),
        });
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Renders the user side of the history for the extraction prompt,
    /// numbered earliest to latest so the model can treat it as a stack.
    pub fn render_user_history(&self) -> String {
        self.messages
            .iter()
            .filter(|m| m.role == Role::User)
            .enumerate()
            .map(|(i, m)| format!("{}. {}", i + 1, m.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
