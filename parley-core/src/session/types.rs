//! Session data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The leading instruction message (sent to providers as `system`)
    #[serde(rename = "system")]
    Instruction,
    User,
    Assistant,
}

impl Role {
    /// Wire name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Instruction => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a new chat message
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// A conversation session
///
/// The first message is always the instruction message. It is set once in
/// [`Session::new`] and nothing in this type removes or reorders messages.
#[derive(Debug, Clone)]
pub struct Session {
    /// Session identifier
    pub id: String,
    messages: Vec<Message>,
    /// Session creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session seeded with the instruction message
    pub fn new(id: impl Into<String>, instruction: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            messages: vec![Message::new(Role::Instruction, instruction)],
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a message.
    ///
    /// Blank user messages are rejected and nothing is appended. Only the
    /// seed may carry the instruction role.
    pub fn push(&mut self, role: Role, content: impl Into<String>) -> crate::Result<()> {
        let content = content.into();
        match role {
            Role::Instruction => {
                return Err(crate::Error::Validation(
                    "instruction message can only be set when the session is created".to_string(),
                ));
            }
            Role::User if content.trim().is_empty() => {
                return Err(crate::Error::Validation(
                    "user message must not be blank".to_string(),
                ));
            }
            _ => {}
        }

        self.messages.push(Message::new(role, content));
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Full message history, instruction first
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Messages after the instruction message
    pub fn conversation(&self) -> &[Message] {
        &self.messages[1..]
    }

    /// The instruction message content
    pub fn instruction(&self) -> &str {
        &self.messages[0].content
    }

    /// Number of messages, including the instruction
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Always false: a session holds at least its instruction
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
