use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::errors::AppError;
use crate::models::InboundMessage;
use crate::services::conversation::{self, Processed};
use crate::state::AppState;

pub const SIGNATURE_HEADER: &str = "x-signature";

/// Base64 HMAC-SHA1 of `body` under `secret`.
pub fn sign(secret: &str, body: &[u8]) -> anyhow::Result<String> {
    let mut mac = Hmac::<Sha1>::new_from_slice(secret.as_bytes())
        .map_err(|_| anyhow::anyhow!("invalid webhook secret"))?;
    mac.update(body);
    Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

fn validate_signature(secret: &str, signature: &str, body: &[u8]) -> bool {
    let Ok(expected) = base64::engine::general_purpose::STANDARD.decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = Hmac::<Sha1>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

// POST /webhook/messages
pub async fn ingest_message(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Processed>, AppError> {
    // Empty secret disables the check (local development).
    if !state.config.webhook_secret.is_empty() {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if signature.is_empty() {
            tracing::warn!("missing X-Signature header");
            return Err(AppError::Unauthorized);
        }
        if !validate_signature(&state.config.webhook_secret, signature, &body) {
            tracing::warn!("invalid webhook signature");
            return Err(AppError::Unauthorized);
        }
    }

    let inbound: InboundMessage = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("invalid message payload: {e}")))?;

    tracing::info!(
        chat_id = %inbound.chat_id,
        role = inbound.role.as_str(),
        contact = %inbound.context.label(),
        "incoming chat message"
    );

    let processed = conversation::process_inbound(&state, &inbound).await?;
    Ok(Json(processed))
}
