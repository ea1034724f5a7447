use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::check_auth;
use crate::errors::AppError;
use crate::models::{ActiveChat, Message};
use crate::services::reply_gate::GateDecision;
use crate::state::AppState;

const DEFAULT_ACTIVE_HOURS: i64 = 24;

#[derive(Deserialize)]
pub struct ActiveQuery {
    pub hours: Option<i64>,
}

// GET /api/chats/active
pub async fn active_chats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ActiveQuery>,
) -> Result<Json<Vec<ActiveChat>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let hours = query.hours.unwrap_or(DEFAULT_ACTIVE_HOURS);
    if hours <= 0 {
        return Err(AppError::BadRequest("hours must be positive".to_string()));
    }
    Ok(Json(state.store.active_chats(hours)?))
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

// GET /api/chats/:chat_id/history
pub async fn history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(chat_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<Message>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let default_limit = usize::try_from(state.config.history_limit).unwrap_or(50);
    let limit = query.limit.unwrap_or(default_limit);
    Ok(Json(state.store.history(&chat_id, limit)?))
}

#[derive(Deserialize)]
pub struct ShouldReplyQuery {
    pub contact: Option<String>,
}

#[derive(Serialize)]
pub struct ShouldReplyResponse {
    pub chat_id: String,
    pub should_reply: bool,
    pub decision: GateDecision,
}

// GET /api/chats/:chat_id/should-reply
pub async fn should_reply(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(chat_id): Path<String>,
    Query(query): Query<ShouldReplyQuery>,
) -> Result<Json<ShouldReplyResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let decision = state.gate.decide(&chat_id)?;
    tracing::info!(
        chat_id = %chat_id,
        contact = query.contact.as_deref().unwrap_or(""),
        ?decision,
        "reply gate queried"
    );

    Ok(Json(ShouldReplyResponse {
        should_reply: decision.should_reply(),
        chat_id,
        decision,
    }))
}
