//! API route definitions.
//!
//! `POST /api/v1/chat` is the turn-processing endpoint: the session id
//! comes from the `X-Session-ID` header, the body carries the message and
//! optional seed history, and the response streams one JSON `TurnUpdate`
//! per line (NDJSON) until the turn's final snapshot.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tripflow_agents::Orchestrator;
use tripflow_core::ChatMessage;

/// Session id used when the client sends none.
const DEFAULT_SESSION_ID: &str = "default";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

/// Chat request body.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Optional transcript to seed a fresh session with.
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

/// Build the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/chat", post(chat))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Response {
    if request.message.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "message must not be empty" })),
        )
            .into_response();
    }

    let session_id = headers
        .get("x-session-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or(DEFAULT_SESSION_ID)
        .to_string();

    tracing::info!(%session_id, "chat turn received");

    let updates = state
        .orchestrator
        .handle_message(&session_id, &request.message, request.history)
        .await;

    // One JSON document per line; a contained engine error becomes a final
    // error line, never a broken stream.
    let lines = updates.map(|item| {
        let line = match item {
            Ok(update) => serde_json::to_string(&update)
                .unwrap_or_else(|error| json!({ "error": error.to_string() }).to_string()),
            Err(error) => json!({ "error": error.to_string() }).to_string(),
        };
        Ok::<String, Infallible>(line + "\n")
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .body(Body::from_stream(lines))
        .expect("static response parts are valid")
}
