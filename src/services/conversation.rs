use std::sync::Arc;

use serde::Serialize;

use crate::models::{BookingOutcome, InboundMessage, Role};
use crate::services::reply_gate::GateDecision;
use crate::state::AppState;

/// What happened to one inbound message.
#[derive(Debug, Serialize)]
pub struct Processed {
    pub message_id: String,
    pub inserted: bool,
    pub should_reply: bool,
    pub decision: Option<GateDecision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<BookingOutcome>,
}

/// Append, gate, and when the gate opens for a customer turn, attempt the
/// booking the message asks for. A replayed message is stored once and
/// never triggers a second attempt. Only the turn the gate actually judged
/// is booked: a late or future-dated message that is not the chat's latest
/// valid message gets no attempt even while the gate is open.
pub async fn process_inbound(
    state: &Arc<AppState>,
    inbound: &InboundMessage,
) -> anyhow::Result<Processed> {
    let appended = state.store.append(inbound)?;

    if !appended.inserted {
        tracing::info!(chat_id = %inbound.chat_id, id = %appended.id, "duplicate message, nothing to do");
        return Ok(Processed {
            message_id: appended.id,
            inserted: false,
            should_reply: false,
            decision: None,
            outcome: None,
        });
    }

    let label = inbound.context.label();
    let decision = match state.gate.decide(&inbound.chat_id) {
        Ok(decision) => decision,
        Err(e) => {
            tracing::error!(error = %e, chat_id = %inbound.chat_id, "reply gate failed, not replying");
            GateDecision::NoHistory
        }
    };
    let should_reply = decision.should_reply();

    tracing::info!(
        chat_id = %inbound.chat_id,
        contact = %label,
        ?decision,
        reply = should_reply,
        "message ingested"
    );

    let is_latest = should_reply && is_latest_turn(state, &inbound.chat_id, &appended.id);

    let outcome = if is_latest && inbound.role == Role::Customer {
        let outcome = state
            .orchestrator
            .attempt(&inbound.content, &inbound.context)
            .await;
        tracing::info!(
            chat_id = %inbound.chat_id,
            success = outcome.success,
            kind = ?outcome.error_kind,
            "booking attempt finished"
        );
        Some(outcome)
    } else {
        None
    };

    Ok(Processed {
        message_id: appended.id,
        inserted: true,
        should_reply,
        decision: Some(decision),
        outcome,
    })
}

fn is_latest_turn(state: &AppState, chat_id: &str, id: &str) -> bool {
    match state.store.last_valid_message(chat_id) {
        Ok(Some(latest)) if latest.id == id => true,
        Ok(latest) => {
            tracing::info!(
                chat_id,
                id,
                latest = ?latest.map(|m| m.id),
                "message is not the latest valid turn, skipping booking"
            );
            false
        }
        Err(e) => {
            tracing::error!(error = %e, chat_id, "latest message lookup failed, skipping booking");
            false
        }
    }
}
