use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use crate::models::Role;
use crate::services::message_store::MessageStore;
use crate::services::timestamps;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GateDecision {
    NoHistory,
    AssistantHasFloor,
    Stale { elapsed_secs: i64 },
    Reply { elapsed_secs: i64 },
}

impl GateDecision {
    pub fn should_reply(&self) -> bool {
        matches!(self, GateDecision::Reply { .. })
    }
}

/// Decides whether the bot should answer a chat right now, re-evaluated from
/// the stored history on every call.
pub struct ReplyGate {
    store: Arc<MessageStore>,
    window: Duration,
}

impl ReplyGate {
    pub fn new(store: Arc<MessageStore>, window: Duration) -> Self {
        Self { store, window }
    }

    pub fn decide(&self, chat_id: &str) -> anyhow::Result<GateDecision> {
        self.decide_at(chat_id, timestamps::local_now(self.store.offset()))
    }

    /// `now` is naive local time in the store's offset.
    pub fn decide_at(&self, chat_id: &str, now: NaiveDateTime) -> anyhow::Result<GateDecision> {
        let Some(last) = self.store.last_valid_message_at(chat_id, now)? else {
            return Ok(GateDecision::NoHistory);
        };

        if last.role == Role::Assistant {
            return Ok(GateDecision::AssistantHasFloor);
        }

        // last_valid_message only returns rows with a readable timestamp.
        let Some(sent_at) = timestamps::to_local(&last.timestamp, self.store.offset()) else {
            return Ok(GateDecision::NoHistory);
        };

        let elapsed = now - sent_at;
        let elapsed_secs = elapsed.num_seconds();
        if elapsed < self.window {
            Ok(GateDecision::Reply { elapsed_secs })
        } else {
            Ok(GateDecision::Stale { elapsed_secs })
        }
    }

    pub fn should_reply(&self, chat_id: &str, contact_label: &str) -> bool {
        self.should_reply_at(chat_id, contact_label, timestamps::local_now(self.store.offset()))
    }

    pub fn should_reply_at(&self, chat_id: &str, contact_label: &str, now: NaiveDateTime) -> bool {
        match self.decide_at(chat_id, now) {
            Ok(decision) => {
                tracing::info!(
                    chat_id,
                    contact = contact_label,
                    ?decision,
                    reply = decision.should_reply(),
                    "reply gate evaluated"
                );
                decision.should_reply()
            }
            Err(e) => {
                tracing::error!(error = %e, chat_id, contact = contact_label, "reply gate failed, not replying");
                false
            }
        }
    }
}
