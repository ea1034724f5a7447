//! Wire types of the booking backend.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Store {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Therapist {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub store_id: Option<i64>,
    #[serde(default)]
    pub specialties: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TherapistQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_experience: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
}

impl TherapistQuery {
    pub fn in_store(store_id: i64) -> Self {
        Self {
            store_id: Some(store_id),
            limit: Some(100),
            ..Default::default()
        }
    }

    pub fn by_name(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            limit: Some(100),
            ..Default::default()
        }
    }
}

/// Body of `POST /appointments/smart`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SmartAppointmentPayload {
    pub therapist_name: Option<String>,
    pub appointment_time: Option<String>,
    pub appointment_date: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub store_name: Option<String>,
    pub notes: String,
}

/// Envelope returned by mutating backend endpoints, success or not.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BackendReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl BackendReply {
    /// Human-readable failure text; the backend sends either a bare string or
    /// `{code, message}`.
    pub fn error_text(&self) -> String {
        let from_error = match &self.error {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Object(obj)) => obj
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        };
        from_error
            .or_else(|| self.message.clone())
            .unwrap_or_default()
    }

    pub fn appointment_id(&self) -> Option<String> {
        let data = self.data.as_ref()?;
        let id = data.get("appointment_id").or_else(|| data.get("id"))?;
        match id {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn data_str(&self, key: &str) -> Option<String> {
        self.data
            .as_ref()?
            .get(key)?
            .as_str()
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_text_from_object() {
        let reply: BackendReply = serde_json::from_str(
            r#"{"success":false,"error":{"code":"CONFLICT","message":"该时间段已被预约"}}"#,
        )
        .unwrap();
        assert_eq!(reply.error_text(), "该时间段已被预约");
    }

    #[test]
    fn test_error_text_from_string_and_message() {
        let reply: BackendReply =
            serde_json::from_str(r#"{"success":false,"error":"门店不存在"}"#).unwrap();
        assert_eq!(reply.error_text(), "门店不存在");

        let reply: BackendReply =
            serde_json::from_str(r#"{"success":false,"message":"不在营业时间"}"#).unwrap();
        assert_eq!(reply.error_text(), "不在营业时间");
    }

    #[test]
    fn test_appointment_id_variants() {
        let reply: BackendReply =
            serde_json::from_str(r#"{"success":true,"data":{"appointment_id":17}}"#).unwrap();
        assert_eq!(reply.appointment_id().as_deref(), Some("17"));

        let reply: BackendReply =
            serde_json::from_str(r#"{"success":true,"data":{"id":"A-9"}}"#).unwrap();
        assert_eq!(reply.appointment_id().as_deref(), Some("A-9"));

        let reply: BackendReply = serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert_eq!(reply.appointment_id(), None);
    }

    #[test]
    fn test_therapist_keeps_unknown_fields() {
        let t: Therapist = serde_json::from_str(
            r#"{"id":3,"name":"马老师","store_id":1,"specialties":["推拿"],"experience_years":9}"#,
        )
        .unwrap();
        assert_eq!(t.extra["experience_years"], 9);
        let back = serde_json::to_value(&t).unwrap();
        assert_eq!(back["experience_years"], 9);
    }
}
