use parley_agent::TurnError;
use tokio::sync::{mpsc, oneshot};

/// Shared handler state: the channel into the [`crate::Manager`] loop
#[derive(Clone)]
pub struct AppState {
    pub api_tx: mpsc::Sender<ManagerCommand>,
}

impl AppState {
    pub fn new(api_tx: mpsc::Sender<ManagerCommand>) -> Self {
        Self { api_tx }
    }
}

pub enum ManagerCommand {
    Chat(ChatCommand),
    NewSession(oneshot::Sender<String>),
}

/// One chat turn requested over HTTP
pub struct ChatCommand {
    pub session_id: String,
    pub message: String,
    pub reply_tx: oneshot::Sender<Result<Option<String>, TurnError>>,
}
