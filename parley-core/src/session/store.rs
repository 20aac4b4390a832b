//! Session store shared by the CLI and the HTTP server

use super::types::{Role, Session};
use crate::utils::file_timestamp;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Shared handle to one session.
///
/// Holding the lock for a whole turn serializes turns on the same session
/// while other sessions proceed independently.
pub type SessionHandle = Arc<Mutex<Session>>;

/// Owns every conversation session for the lifetime of the process.
///
/// Sessions are never evicted.
#[derive(Debug)]
pub struct SessionStore {
    /// Instruction message every new session is seeded with
    instruction: String,
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionStore {
    /// Create an empty store whose sessions start with `instruction`
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// The instruction message new sessions are seeded with
    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    /// Get the session for `id`, creating it on first reference
    pub fn get_or_create(&self, id: &str) -> SessionHandle {
        if let Some(handle) = self.sessions.read().get(id) {
            return handle.clone();
        }

        self.sessions
            .write()
            .entry(id.to_string())
            .or_insert_with(|| {
                debug!("Creating session {}", id);
                Arc::new(Mutex::new(Session::new(id, self.instruction.clone())))
            })
            .clone()
    }

    /// Get a session if it exists
    pub fn get(&self, id: &str) -> Option<SessionHandle> {
        self.sessions.read().get(id).cloned()
    }

    /// Mint a fresh session identifier and register an empty session for it
    pub fn new_session(&self) -> String {
        let base = format!("session_{}", file_timestamp(chrono::Local::now()));
        let mut sessions = self.sessions.write();

        let mut id = base.clone();
        let mut suffix = 1;
        while sessions.contains_key(&id) {
            id = format!("{}_{}", base, suffix);
            suffix += 1;
        }

        sessions.insert(
            id.clone(),
            Arc::new(Mutex::new(Session::new(&id, self.instruction.clone()))),
        );
        debug!("Minted session {}", id);
        id
    }

    /// Append one message to an existing session
    pub async fn append(
        &self,
        id: &str,
        role: Role,
        content: impl Into<String>,
    ) -> crate::Result<()> {
        let handle = self
            .get(id)
            .ok_or_else(|| crate::Error::NotFound(format!("session {}", id)))?;
        let mut session = handle.lock().await;
        session.push(role, content)
    }

    /// Copy of a session's current state
    pub async fn snapshot(&self, id: &str) -> Option<Session> {
        let handle = self.get(id)?;
        let session = handle.lock().await;
        Some(session.clone())
    }

    /// Whether a session exists for `id`
    pub fn contains(&self, id: &str) -> bool {
        self.sessions.read().contains_key(id)
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Whether no session has been created yet
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
