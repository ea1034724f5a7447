use serde::{Deserialize, Serialize};

use super::appointment::ContactContext;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(alias = "user")]
    Customer,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "assistant" => Role::Assistant,
            _ => Role::Customer,
        }
    }
}

/// A stored chat turn. `id` is the dedup fingerprint, `seq` the insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub chat_id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: String,
    pub raw: serde_json::Value,
    #[serde(skip_serializing)]
    pub seq: i64,
}

/// Message as delivered by the chat client, before normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    #[serde(default = "unknown_chat")]
    pub chat_id: String,
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<serde_json::Value>,
    #[serde(flatten)]
    pub context: ContactContext,
}

fn unknown_chat() -> String {
    "unknown_chat".to_string()
}

impl InboundMessage {
    pub fn new(chat_id: &str, role: Role, content: &str) -> Self {
        Self {
            chat_id: chat_id.to_string(),
            role,
            content: content.to_string(),
            timestamp: None,
            context: ContactContext::default(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: serde_json::Value) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActiveChat {
    pub chat_id: String,
    pub last_activity: String,
    pub message_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_from_client_payload() {
        let json = r#"{"chatId":"c-1","role":"user","content":"你好","timestamp":1700000000000,"contactName":"吴先生","shopName":"静安寺店"}"#;
        let msg: InboundMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.chat_id, "c-1");
        assert_eq!(msg.role, Role::Customer);
        assert_eq!(msg.context.contact_name.as_deref(), Some("吴先生"));
        assert_eq!(msg.context.shop_name.as_deref(), Some("静安寺店"));
        assert!(msg.timestamp.unwrap().is_number());
    }

    #[test]
    fn test_inbound_defaults_chat_id() {
        let msg: InboundMessage =
            serde_json::from_str(r#"{"role":"assistant","content":"好的"}"#).unwrap();
        assert_eq!(msg.chat_id, "unknown_chat");
        assert_eq!(msg.role, Role::Assistant);
        assert!(msg.timestamp.is_none());
    }

    #[test]
    fn test_role_round_trip_str() {
        assert_eq!(Role::parse(Role::Customer.as_str()), Role::Customer);
        assert_eq!(Role::parse(Role::Assistant.as_str()), Role::Assistant);
    }
}
