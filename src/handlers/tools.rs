use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use super::check_auth;
use crate::errors::AppError;
use crate::models::{ToolCall, ToolCallResult, ToolDefinition, ToolResult};
use crate::state::AppState;

// GET /api/tools
pub async fn list_tools(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<ToolDefinition>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    Ok(Json(state.tools.definitions()))
}

#[derive(Deserialize)]
pub struct ToolCallsRequest {
    pub tool_calls: Vec<ToolCall>,
}

// POST /api/tools/calls
pub async fn execute_calls(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ToolCallsRequest>,
) -> Result<Json<Vec<ToolCallResult>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    Ok(Json(state.tools.execute_calls(&body.tool_calls).await))
}

// POST /api/tools/:name
pub async fn execute_tool(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(name): Path<String>,
    body: Option<Json<Value>>,
) -> Result<Json<ToolResult>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let arguments = body.map(|Json(v)| v).unwrap_or(Value::Null);
    Ok(Json(state.tools.execute(&name, arguments).await))
}
