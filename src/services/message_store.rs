//! Durable, deduplicated log of chat turns.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, Utc};
use rusqlite::Connection;
use sha2::{Digest, Sha256};

use crate::db::queries;
use crate::models::{ActiveChat, InboundMessage, Message, Role};
use crate::services::timestamps;

/// Result of [`MessageStore::append`]. A duplicate is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Appended {
    pub id: String,
    pub inserted: bool,
}

pub struct MessageStore {
    conn: Arc<Mutex<Connection>>,
    offset: FixedOffset,
    clock_skew: Duration,
}

impl MessageStore {
    pub fn new(conn: Connection, offset: FixedOffset, clock_skew: Duration) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            offset,
            clock_skew,
        }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    fn conn(&self) -> anyhow::Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("message store lock poisoned"))
    }

    pub fn append(&self, inbound: &InboundMessage) -> anyhow::Result<Appended> {
        self.append_at(inbound, Utc::now())
    }

    /// Normalizes, fingerprints and stores one message; re-appending the same
    /// message is a silent no-op. The row is committed before returning.
    pub fn append_at(&self, inbound: &InboundMessage, now: DateTime<Utc>) -> anyhow::Result<Appended> {
        let timestamp = timestamps::normalize(inbound.timestamp.as_ref(), self.offset, now);
        let id = fingerprint(
            &inbound.chat_id,
            inbound.role,
            &inbound.content,
            inbound.timestamp.as_ref().map(|_| timestamp.as_str()),
        );

        let mut raw = serde_json::to_value(inbound)?;
        if let Some(obj) = raw.as_object_mut() {
            obj.insert("timestamp".to_string(), serde_json::Value::String(timestamp.clone()));
        }

        let message = Message {
            id: id.clone(),
            chat_id: inbound.chat_id.clone(),
            role: inbound.role,
            content: inbound.content.clone(),
            timestamp,
            raw,
            seq: 0,
        };

        let db = self.conn()?;
        if queries::message_exists(&db, &id)? {
            tracing::debug!(id = %id, chat_id = %message.chat_id, "message already stored, skipping");
            return Ok(Appended { id, inserted: false });
        }

        let inserted = queries::insert_message(&db, &message)?;
        if inserted {
            tracing::debug!(
                id = %id,
                chat_id = %message.chat_id,
                role = message.role.as_str(),
                timestamp = %message.timestamp,
                "message stored"
            );
        } else {
            tracing::debug!(id = %id, "concurrent duplicate insert ignored");
        }

        Ok(Appended { id, inserted })
    }

    /// The most recent `limit` messages of a chat, oldest first.
    pub fn history(&self, chat_id: &str, limit: usize) -> anyhow::Result<Vec<Message>> {
        let messages = {
            let db = self.conn()?;
            queries::get_chat_messages(&db, chat_id)?
        };

        let mut keyed: Vec<_> = messages
            .into_iter()
            .map(|m| (timestamps::to_local(&m.timestamp, self.offset), m))
            .collect();
        // Unreadable timestamps sort first; ties fall back to insertion order.
        keyed.sort_by(|(a_time, a), (b_time, b)| a_time.cmp(b_time).then(a.seq.cmp(&b.seq)));

        let skip = keyed.len().saturating_sub(limit);
        Ok(keyed.into_iter().skip(skip).map(|(_, m)| m).collect())
    }

    pub fn last_valid_message(&self, chat_id: &str) -> anyhow::Result<Option<Message>> {
        self.last_valid_message_at(chat_id, timestamps::local_now(self.offset))
    }

    /// Latest message whose timestamp is not beyond `now` plus the clock-skew
    /// tolerance. Same-second ties go to the later insert.
    pub fn last_valid_message_at(
        &self,
        chat_id: &str,
        now: NaiveDateTime,
    ) -> anyhow::Result<Option<Message>> {
        let messages = {
            let db = self.conn()?;
            queries::get_chat_messages(&db, chat_id)?
        };

        let horizon = now + self.clock_skew;
        let latest = messages
            .into_iter()
            .filter_map(|m| {
                let local = timestamps::to_local(&m.timestamp, self.offset)?;
                if local > horizon {
                    tracing::debug!(id = %m.id, timestamp = %m.timestamp, "ignoring future-dated message");
                    return None;
                }
                Some((local, m))
            })
            .max_by(|(a_time, a), (b_time, b)| a_time.cmp(b_time).then(a.seq.cmp(&b.seq)));

        Ok(latest.map(|(_, m)| m))
    }

    pub fn active_chats(&self, hours: i64) -> anyhow::Result<Vec<ActiveChat>> {
        let since = (Utc::now() - Duration::hours(hours))
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
        let db = self.conn()?;
        queries::get_active_chats(&db, &since)
    }

    pub fn exists(&self, id: &str) -> anyhow::Result<bool> {
        let db = self.conn()?;
        queries::message_exists(&db, id)
    }
}

/// Stable dedup key of a message. `timestamp` is the normalized value when
/// the client supplied one, `None` when it did not.
pub fn fingerprint(chat_id: &str, role: Role, content: &str, timestamp: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    for part in [chat_id, role.as_str(), content, timestamp.unwrap_or("")] {
        hasher.update(part.as_bytes());
        hasher.update([0x1f]);
    }
    hex::encode(hasher.finalize())
}
