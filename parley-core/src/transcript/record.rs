//! Text and JSON renderings of a session snapshot

use crate::session::{Message, Session};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Structured transcript, serialized as the `.json` file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptRecord {
    /// Conversation messages, instruction excluded
    pub messages: Vec<Message>,
    /// ISO-8601 time of persistence
    pub date: String,
    pub session_id: String,
}

impl TranscriptRecord {
    /// Project a session into a record
    pub fn from_session(session: &Session, at: DateTime<Local>) -> Self {
        Self {
            messages: session.conversation().to_vec(),
            date: at.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            session_id: session.id.clone(),
        }
    }

    /// Pretty JSON with four-space indentation
    pub fn to_json(&self) -> crate::Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)?;
        String::from_utf8(buf).map_err(|e| crate::Error::Serialization(e.to_string()))
    }
}

/// Render the line-oriented text log of a session
pub fn render_text(session: &Session, at: DateTime<Local>) -> String {
    let mut out = format!("Conversation: {}\n", at.format("%Y-%m-%d %H:%M:%S"));
    for message in session.conversation() {
        let _ = writeln!(out, "{}: {}", message.role, message.content);
    }
    out
}
