use rusqlite::{params, Connection, ErrorCode};

use crate::models::{ActiveChat, Message, Role};

const MESSAGE_COLUMNS: &str = "rowid, id, chat_id, role, content, timestamp, raw_data";

// ── Messages ──

pub fn message_exists(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM messages WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Inserts one row. Returns `false` when the fingerprint is already stored,
/// including when another writer won the race to the primary key.
pub fn insert_message(conn: &Connection, msg: &Message) -> anyhow::Result<bool> {
    let raw_data = serde_json::to_string(&msg.raw)?;
    let result = conn.execute(
        "INSERT INTO messages (id, chat_id, role, content, timestamp, raw_data)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            msg.id,
            msg.chat_id,
            msg.role.as_str(),
            msg.content,
            msg.timestamp,
            raw_data,
        ],
    );

    match result {
        Ok(_) => Ok(true),
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

/// All messages of one chat in insertion order.
pub fn get_chat_messages(conn: &Connection, chat_id: &str) -> anyhow::Result<Vec<Message>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages WHERE chat_id = ?1 ORDER BY rowid ASC"
    ))?;

    let rows = stmt.query_map(params![chat_id], |row| Ok(parse_message_row(row)))?;

    let mut messages = vec![];
    for row in rows {
        messages.push(row??);
    }
    Ok(messages)
}

/// Chats with at least one message ingested after `since` (UTC,
/// `%Y-%m-%d %H:%M:%S`), most recently active first.
pub fn get_active_chats(conn: &Connection, since: &str) -> anyhow::Result<Vec<ActiveChat>> {
    let mut stmt = conn.prepare(
        "SELECT chat_id, MAX(processed_at) AS last_activity, COUNT(*) AS message_count
         FROM messages
         WHERE processed_at > ?1
         GROUP BY chat_id
         ORDER BY last_activity DESC, MAX(rowid) DESC",
    )?;

    let rows = stmt.query_map(params![since], |row| {
        Ok(ActiveChat {
            chat_id: row.get(0)?,
            last_activity: row.get(1)?,
            message_count: row.get(2)?,
        })
    })?;

    let mut chats = vec![];
    for row in rows {
        chats.push(row?);
    }
    Ok(chats)
}

fn parse_message_row(row: &rusqlite::Row) -> anyhow::Result<Message> {
    let seq: i64 = row.get(0)?;
    let id: String = row.get(1)?;
    let chat_id: String = row.get(2)?;
    let role_str: String = row.get(3)?;
    let content: String = row.get(4)?;
    let timestamp: String = row.get(5)?;
    let raw_data: String = row.get(6)?;

    let raw = serde_json::from_str(&raw_data).unwrap_or(serde_json::Value::Null);

    Ok(Message {
        id,
        chat_id,
        role: Role::parse(&role_str),
        content,
        timestamp,
        raw,
        seq,
    })
}
