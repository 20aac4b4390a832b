//! Session management for conversation history
//!
//! A session is an ordered list of role-tagged messages that always starts
//! with the configured instruction message.

pub mod store;
pub mod types;

pub use store::{SessionHandle, SessionStore};
pub use types::{Message, Role, Session};
