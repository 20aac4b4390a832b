//! Turn processing for parley
//!
//! A turn takes one user message, asks the completion provider for a reply
//! with the full session history, records the reply and persists the
//! transcript.

pub mod error;
pub mod turn;

pub use error::TurnError;
pub use turn::{CompletionSettings, TurnProcessor};
