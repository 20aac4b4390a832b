use parley_agent::TurnProcessor;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::state::{ChatCommand, ManagerCommand};

/// Owns the turn processor and serves commands coming from HTTP handlers
pub struct Manager {
    api_rx: mpsc::Receiver<ManagerCommand>,
    turns: Arc<TurnProcessor>,
}

impl Manager {
    pub fn new(api_rx: mpsc::Receiver<ManagerCommand>, turns: Arc<TurnProcessor>) -> Self {
        Self { api_rx, turns }
    }

    /// Run until every sender of the command channel is dropped.
    ///
    /// Each chat turn runs on its own task; ordering within a session is
    /// enforced by the session lock inside the turn processor.
    pub async fn run(mut self) -> anyhow::Result<()> {
        info!("Manager loop started");

        while let Some(cmd) = self.api_rx.recv().await {
            match cmd {
                ManagerCommand::Chat(chat) => {
                    debug!("Processing chat request for session {}", chat.session_id);
                    let turns = self.turns.clone();
                    tokio::spawn(async move { Self::handle_chat(turns, chat).await });
                }
                ManagerCommand::NewSession(reply_tx) => {
                    let session_id = self.turns.new_session();
                    info!("Created session {}", session_id);
                    if reply_tx.send(session_id).is_err() {
                        warn!("New session requester went away");
                    }
                }
            }
        }

        info!("Manager channel closed, stopping loop");
        Ok(())
    }

    async fn handle_chat(turns: Arc<TurnProcessor>, chat: ChatCommand) {
        let ChatCommand {
            session_id,
            message,
            reply_tx,
        } = chat;

        let result = turns.handle_turn(&session_id, &message).await;
        if reply_tx.send(result).is_err() {
            warn!("Chat requester for session {} went away", session_id);
        }
    }
}
