pub mod chats;
pub mod health;
pub mod tools;
pub mod webhook;

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::Router;

use crate::errors::AppError;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/webhook/messages", post(webhook::ingest_message))
        .route("/api/chats/active", get(chats::active_chats))
        .route("/api/chats/:chat_id/history", get(chats::history))
        .route("/api/chats/:chat_id/should-reply", get(chats::should_reply))
        .route("/api/tools", get(tools::list_tools))
        .route("/api/tools/calls", post(tools::execute_calls))
        .route("/api/tools/:name", post(tools::execute_tool))
        .with_state(state)
}

pub(crate) fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token.is_empty() || token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}
