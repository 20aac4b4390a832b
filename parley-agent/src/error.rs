//! Errors produced while handling a turn

use parley_providers::ProviderError;
use thiserror::Error;

/// Why a turn did not produce a recorded reply
#[derive(Error, Debug)]
pub enum TurnError {
    /// The user text was empty after trimming; nothing was recorded or sent
    #[error("No message provided")]
    EmptyInput,

    /// The provider call failed; the user message stays in the history
    #[error("Completion failed: {0}")]
    CompletionFailed(#[from] ProviderError),

    /// The reply was recorded in memory but the transcript could not be written
    #[error("Failed to persist transcript: {source}")]
    PersistenceFailed {
        reply: String,
        source: parley_core::Error,
    },

    /// The session rejected an append
    #[error("Session error: {0}")]
    Session(#[from] parley_core::Error),
}

impl TurnError {
    /// Whether the caller sent bad input, as opposed to a server-side failure
    pub fn is_client_error(&self) -> bool {
        matches!(self, TurnError::EmptyInput)
    }

    /// The assistant reply, if one was produced before the failure
    pub fn reply(&self) -> Option<&str> {
        match self {
            TurnError::PersistenceFailed { reply, .. } => Some(reply),
            _ => None,
        }
    }
}
