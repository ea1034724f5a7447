use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::outcome::BookingOutcome;

/// OpenAI-style function tool description handed to the completion provider.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: FunctionSpec,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn function(name: &'static str, description: &'static str, parameters: Value) -> Self {
        Self {
            kind: "function",
            function: FunctionSpec {
                name,
                description,
                parameters,
            },
        }
    }
}

/// One entry of a completion's `tool_calls`; `arguments` is a JSON string.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCall {
    #[serde(default)]
    pub id: Option<String>,
    pub function: ToolCallFunction,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallFunction {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolCallResult {
    pub tool_call_id: String,
    pub function_name: String,
    pub result: ToolResult,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ToolResult {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            ..Default::default()
        }
    }

    pub fn failure(error: &str, message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            message: Some(message.into()),
            suggestion: Some(suggestion.into()),
            ..Default::default()
        }
    }
}

impl From<BookingOutcome> for ToolResult {
    fn from(outcome: BookingOutcome) -> Self {
        let data = outcome.success.then(|| {
            json!({
                "appointment_id": outcome.appointment_id,
                "confirmation": outcome.confirmation,
            })
        });
        Self {
            success: outcome.success,
            data,
            error: outcome.error_kind.map(|k| k.as_str().to_string()),
            message: Some(outcome.message),
            suggestion: outcome.suggestion,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookingErrorKind;

    #[test]
    fn test_failed_outcome_maps_to_error_and_suggestion() {
        let outcome = BookingOutcome::failed(
            BookingErrorKind::TimeConflict,
            "马老师在16:30已经有安排了".to_string(),
            "建议您选择马老师的其他时间".to_string(),
        );
        let result = ToolResult::from(outcome);
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("TIME_CONFLICT"));
        assert!(result.suggestion.unwrap().contains("马老师"));
        assert!(result.data.is_none());
    }

    #[test]
    fn test_definition_serializes_openai_shape() {
        let def = ToolDefinition::function("get_stores", "list stores", json!({"type":"object"}));
        let v = serde_json::to_value(def).unwrap();
        assert_eq!(v["type"], "function");
        assert_eq!(v["function"]["name"], "get_stores");
    }
}
