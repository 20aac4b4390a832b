use axum::{
    routing::{get, post},
    Router,
};
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{chat_handler, index_handler, new_session_handler};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/chat", post(chat_handler))
        .route("/new_session", post(new_session_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(
    state: AppState,
    host: &str,
    port: u16,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            tracing::info!("Server shutting down signal received");
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{ChatResponse, ErrorResponse, NewSessionResponse};
    use crate::Manager;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use parley_agent::{CompletionSettings, TurnProcessor};
    use parley_core::session::SessionStore;
    use parley_core::transcript::TranscriptWriter;
    use parley_providers::{LLMProvider, LLMResponse, Message, ProviderError, ProviderResult};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    struct EchoProvider {
        fail: bool,
    }

    #[async_trait]
    impl LLMProvider for EchoProvider {
        async fn chat(
            &self,
            messages: Vec<Message>,
            _model: Option<String>,
            _max_tokens: i32,
            _temperature: f64,
        ) -> ProviderResult<LLMResponse> {
            if self.fail {
                return Err(ProviderError::ApiError(
                    "HTTP 401 Unauthorized: invalid key sk-secret".to_string(),
                ));
            }
            let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(LLMResponse::text(format!("you said {}", last)))
        }
    }

    fn test_app(fail: bool, transcripts: Option<&std::path::Path>) -> (Router, Arc<TurnProcessor>) {
        let turns = Arc::new(TurnProcessor::new(
            Arc::new(SessionStore::new("be kind")),
            Arc::new(EchoProvider { fail }),
            transcripts.map(|d| TranscriptWriter::new(d).unwrap()),
            CompletionSettings::default(),
        ));
        let (api_tx, api_rx) = mpsc::channel(16);
        tokio::spawn(Manager::new(api_rx, turns.clone()).run());
        (build_router(AppState::new(api_tx)), turns)
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_chat_uses_default_session() {
        let temp_dir = TempDir::new().unwrap();
        let (app, turns) = test_app(false, Some(temp_dir.path()));

        let response = app
            .oneshot(post_json("/chat", r#"{"message":"  hello  "}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: ChatResponse = read_json(response).await;
        assert_eq!(body.session_id, "default");
        assert_eq!(body.response.as_deref(), Some("you said hello"));
        assert_eq!(turns.store().snapshot("default").await.unwrap().len(), 3);
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_chat_keeps_history_per_session() {
        let (app, turns) = test_app(false, None);

        for text in ["one", "two"] {
            let body = format!(r#"{{"message":"{}","session_id":"abc"}}"#, text);
            let response = app.clone().oneshot(post_json("/chat", &body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let body: ChatResponse = read_json(response).await;
            assert_eq!(body.session_id, "abc");
        }

        assert_eq!(turns.store().snapshot("abc").await.unwrap().len(), 5);
        assert!(!turns.store().contains("default"));
    }

    #[tokio::test]
    async fn test_blank_message_is_bad_request() {
        let (app, turns) = test_app(false, None);

        for body in [r#"{"message":"   "}"#, r#"{}"#] {
            let response = app.clone().oneshot(post_json("/chat", body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let body: ErrorResponse = read_json(response).await;
            assert_eq!(body.error, "No message provided");
        }
        assert!(turns.store().is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_is_generic_500() {
        let (app, turns) = test_app(true, None);

        let response = app
            .oneshot(post_json("/chat", r#"{"message":"hi","session_id":"s1"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(!text.contains("sk-secret"));
        let body: ErrorResponse = serde_json::from_str(&text).unwrap();
        assert_eq!(body.error, "Internal server error");

        assert_eq!(turns.store().snapshot("s1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_json_is_rejected() {
        let (app, turns) = test_app(false, None);

        let without_content_type = Request::builder()
            .method("POST")
            .uri("/chat")
            .body(Body::from(r#"{"message":"hi"}"#))
            .unwrap();
        let requests = [
            post_json("/chat", "{not json"),
            post_json("/chat", r#"{"message": 42}"#),
            without_content_type,
        ];

        for request in requests {
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert!(response.headers()[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("application/json"));

            let body: ErrorResponse = read_json(response).await;
            assert_eq!(body.error, "Invalid request body");
        }
        assert!(turns.store().is_empty());
    }

    #[tokio::test]
    async fn test_new_session_ids_are_unique() {
        let (app, turns) = test_app(false, None);

        let mut ids = Vec::new();
        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(post_json("/new_session", ""))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let body: NewSessionResponse = read_json(response).await;
            assert!(body.session_id.starts_with("session_"));
            ids.push(body.session_id);
        }

        assert_ne!(ids[0], ids[1]);
        assert!(turns.store().contains(&ids[0]));
        assert!(turns.store().contains(&ids[1]));
    }

    #[tokio::test]
    async fn test_index_serves_chat_page() {
        let (app, _turns) = test_app(false, None);
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/html"));

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("/chat"));
        assert!(html.contains("/new_session"));
    }
}
