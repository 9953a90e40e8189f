use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Greeting seeded into every fresh session.
pub const GREETING: &str = "Assalomu alaykum! I am your Uzbekistan Tax assistant. \
I can explain tax rules for 2025 or calculate taxes for you. How can I help?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Ordered, append-only conversation history for one client session.
/// Lives in memory only; dropped when the client disconnects.
#[derive(Debug, Clone)]
pub struct ChatSession {
    messages: Vec<Message>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            messages: vec![Message::new(Role::Assistant, GREETING)],
        }
    }

    /// Append a message and return a copy for display.
    pub fn push(&mut self, role: Role, content: impl Into<String>) -> Message {
        let message = Message::new(role, content);
        self.messages.push(message.clone());
        message
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}
