use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::state::{AppState, ChatCommand, ManagerCommand};

/// Chat page served at `/`
pub const INDEX_HTML: &str = include_str!("../assets/index.html");

const DEFAULT_SESSION_ID: &str = "default";

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    /// `null` when the provider produced no content
    pub response: Option<String>,
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewSessionResponse {
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

fn internal_error() -> Response {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

pub async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            tracing::warn!("Rejected chat request body: {}", rejection.body_text());
            return error_response(StatusCode::BAD_REQUEST, "Invalid request body");
        }
    };
    let message = payload.message.trim().to_string();
    if message.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No message provided");
    }
    let session_id = payload
        .session_id
        .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string());

    let (reply_tx, reply_rx) = oneshot::channel();
    let cmd = ManagerCommand::Chat(ChatCommand {
        session_id: session_id.clone(),
        message,
        reply_tx,
    });
    if let Err(e) = state.api_tx.send(cmd).await {
        tracing::error!("Failed to send chat request to manager: {}", e);
        return internal_error();
    }

    match reply_rx.await {
        Ok(Ok(response)) => Json(ChatResponse {
            response,
            session_id,
        })
        .into_response(),
        Ok(Err(e)) if e.is_client_error() => {
            error_response(StatusCode::BAD_REQUEST, "No message provided")
        }
        Ok(Err(e)) => {
            tracing::error!("Error in chat endpoint for session {}: {}", session_id, e);
            internal_error()
        }
        Err(e) => {
            tracing::error!("Failed to receive chat response: {}", e);
            internal_error()
        }
    }
}

pub async fn new_session_handler(State(state): State<AppState>) -> Response {
    let (tx, rx) = oneshot::channel();
    if let Err(e) = state.api_tx.send(ManagerCommand::NewSession(tx)).await {
        tracing::error!("Failed to send NewSession request: {}", e);
        return internal_error();
    }

    match rx.await {
        Ok(session_id) => Json(NewSessionResponse { session_id }).into_response(),
        Err(e) => {
            tracing::error!("Failed to receive NewSession response: {}", e);
            internal_error()
        }
    }
}
