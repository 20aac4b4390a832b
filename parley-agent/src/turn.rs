//! Turn processor: one user message in, one assistant reply out

use parley_core::config::AssistantConfig;
use parley_core::session::{Role, SessionStore};
use parley_core::transcript::{TranscriptPaths, TranscriptWriter};
use parley_core::utils::truncate;
use parley_providers::{to_wire_messages, LLMProvider};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::TurnError;

const PREVIEW_CHARS: usize = 120;

/// Parameters sent with every completion request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionSettings {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl From<&AssistantConfig> for CompletionSettings {
    fn from(config: &AssistantConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self::from(&AssistantConfig::default())
    }
}

/// Drives conversation turns against a shared session store
pub struct TurnProcessor {
    store: Arc<SessionStore>,
    provider: Arc<dyn LLMProvider>,
    transcripts: Option<TranscriptWriter>,
    settings: CompletionSettings,
}

impl TurnProcessor {
    /// Create a processor. `transcripts = None` disables persistence.
    pub fn new(
        store: Arc<SessionStore>,
        provider: Arc<dyn LLMProvider>,
        transcripts: Option<TranscriptWriter>,
        settings: CompletionSettings,
    ) -> Self {
        Self {
            store,
            provider,
            transcripts,
            settings,
        }
    }

    /// Shared session store
    pub fn store(&self) -> Arc<SessionStore> {
        self.store.clone()
    }

    /// Completion parameters in use
    pub fn settings(&self) -> &CompletionSettings {
        &self.settings
    }

    /// Whether transcripts are written after each turn
    pub fn persists_transcripts(&self) -> bool {
        self.transcripts.is_some()
    }

    /// Mint a fresh session
    pub fn new_session(&self) -> String {
        self.store.new_session()
    }

    /// Handle one user message for `session_id`.
    ///
    /// Returns the assistant reply. An empty or missing reply from the
    /// provider is returned unchanged and is neither recorded nor persisted.
    /// The session stays locked for the whole turn, so turns on one session
    /// never interleave.
    pub async fn handle_turn(
        &self,
        session_id: &str,
        user_text: &str,
    ) -> Result<Option<String>, TurnError> {
        let text = user_text.trim();
        if text.is_empty() {
            return Err(TurnError::EmptyInput);
        }

        let handle = self.store.get_or_create(session_id);
        let mut session = handle.lock().await;
        session.push(Role::User, text)?;

        debug!(
            "Turn for session {} ({} messages): {}",
            session_id,
            session.len(),
            truncate(text, PREVIEW_CHARS)
        );

        let max_tokens = i32::try_from(self.settings.max_tokens).unwrap_or(i32::MAX);
        let response = match self
            .provider
            .chat(
                to_wire_messages(session.messages()),
                Some(self.settings.model.clone()),
                max_tokens,
                self.settings.temperature,
            )
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!("Completion failed for session {}: {}", session_id, e);
                return Err(TurnError::CompletionFailed(e));
            }
        };

        let Some(reply) = response.reply().map(str::to_string) else {
            warn!(
                "Empty reply for session {} (finish_reason: {})",
                session_id, response.finish_reason
            );
            return Ok(response.content);
        };

        session.push(Role::Assistant, reply.clone())?;
        debug!(
            "Reply to session {}: {}",
            session_id,
            truncate(&reply, PREVIEW_CHARS)
        );

        if let Some(writer) = &self.transcripts {
            if let Err(source) = writer.persist(&session) {
                error!(
                    "Failed to persist transcript for session {}: {}",
                    session_id, source
                );
                return Err(TurnError::PersistenceFailed { reply, source });
            }
        }

        Ok(Some(reply))
    }

    /// Write the current state of a session.
    ///
    /// Returns `None` when persistence is disabled or the session is unknown.
    pub async fn persist_session(
        &self,
        session_id: &str,
    ) -> parley_core::Result<Option<TranscriptPaths>> {
        let Some(writer) = &self.transcripts else {
            return Ok(None);
        };
        let Some(handle) = self.store.get(session_id) else {
            debug!("Nothing to persist for unknown session {}", session_id);
            return Ok(None);
        };

        let session = handle.lock().await;
        let paths = writer.persist(&session)?;
        info!(
            "Saved transcript for session {} to {}",
            session_id,
            paths.text.display()
        );
        Ok(Some(paths))
    }
}
