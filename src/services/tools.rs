//! Callable tools exposed to the chat-completion layer.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::models::{ContactContext, ToolCall, ToolCallResult, ToolDefinition, ToolResult, TherapistQuery};
use crate::services::booking::{BookingApi, BookingOrchestrator};

/// Anything that can run tool calls issued by a completion provider.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    fn definitions(&self) -> Vec<ToolDefinition>;

    /// Runs one tool. Failures are reported in the result, never as `Err`.
    async fn execute(&self, name: &str, arguments: Value) -> ToolResult;

    /// Runs a completion's `tool_calls` in order. A malformed call fails
    /// alone; the rest of the batch still runs.
    async fn execute_calls(&self, calls: &[ToolCall]) -> Vec<ToolCallResult> {
        let mut results = Vec::with_capacity(calls.len());
        for (i, call) in calls.iter().enumerate() {
            let name = call.function.name.as_str();
            let raw = call.function.arguments.trim();
            let result = match serde_json::from_str::<Value>(if raw.is_empty() { "{}" } else { raw }) {
                Ok(arguments) => self.execute(name, arguments).await,
                Err(e) => {
                    tracing::warn!(tool = name, error = %e, "tool call arguments are not valid JSON");
                    invalid_arguments(e)
                }
            };
            results.push(ToolCallResult {
                tool_call_id: call.id.clone().unwrap_or_else(|| format!("call_{i}")),
                function_name: name.to_string(),
                result,
            });
        }
        results
    }
}

fn invalid_arguments(e: impl std::fmt::Display) -> ToolResult {
    ToolResult::failure("INVALID_ARGUMENTS", format!("参数格式错误: {e}"), "请检查调用参数后重试")
}

fn backend_unavailable() -> ToolResult {
    ToolResult::failure("SYSTEM_ERROR", "预约系统暂时不可用", "请稍后重试，或联系客服协助处理")
}

fn args<T: DeserializeOwned>(arguments: Value) -> Result<T, ToolResult> {
    let arguments = if arguments.is_null() { json!({}) } else { arguments };
    serde_json::from_value(arguments).map_err(invalid_arguments)
}

#[derive(Debug, Default, Deserialize)]
struct CreateSmartAppointmentArgs {
    therapist_name: Option<String>,
    appointment_time: Option<String>,
    customer_name: Option<String>,
    customer_phone: Option<String>,
    store_name: Option<String>,
    appointment_date: Option<String>,
    notes: Option<String>,
    customer_message: Option<String>,
    context_info: Option<ContactContext>,
}

#[derive(Debug, Deserialize)]
struct PhoneArgs {
    phone: String,
}

#[derive(Debug, Deserialize)]
struct CancelArgs {
    appointment_id: Value,
    phone: String,
}

/// Blank strings from the model count as absent.
fn given(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub struct BookingTools {
    api: Arc<dyn BookingApi>,
    orchestrator: Arc<BookingOrchestrator>,
}

impl BookingTools {
    pub fn new(api: Arc<dyn BookingApi>, orchestrator: Arc<BookingOrchestrator>) -> Self {
        Self { api, orchestrator }
    }

    async fn get_stores(&self) -> ToolResult {
        match self.api.get_stores().await {
            Ok(stores) => ToolResult::ok(json!({ "stores": stores })),
            Err(e) => {
                tracing::error!(error = %e, "get_stores failed");
                backend_unavailable()
            }
        }
    }

    async fn search_therapists(&self, query: TherapistQuery) -> ToolResult {
        match self.api.search_therapists(&query).await {
            Ok(therapists) => ToolResult::ok(json!({ "therapists": therapists })),
            Err(e) => {
                tracing::error!(error = %e, "search_therapists failed");
                backend_unavailable()
            }
        }
    }

    /// Natural-language mode parses `customer_message` with `context_info`;
    /// any structured field the caller supplied overrides the parsed one.
    async fn create_smart_appointment(&self, args: CreateSmartAppointmentArgs) -> ToolResult {
        let context = args.context_info.unwrap_or_default();
        let message = given(args.customer_message).unwrap_or_default();
        let mut request = self.orchestrator.parser().parse(&message, &context);

        if let Some(v) = given(args.therapist_name) {
            request.therapist_name = Some(v);
        }
        if let Some(v) = given(args.appointment_time) {
            request.appointment_time = Some(v);
        }
        if let Some(v) = given(args.customer_name) {
            request.customer_name = Some(v);
        }
        if let Some(v) = given(args.customer_phone) {
            request.customer_phone = Some(v);
        }
        if let Some(v) = given(args.store_name) {
            request.store_name = Some(v);
        }
        if let Some(v) = given(args.appointment_date) {
            request.appointment_date = v;
        }
        if let Some(v) = given(args.notes) {
            request.notes = v;
        }

        self.orchestrator.attempt_request(request).await.into()
    }

    async fn get_user_appointments(&self, phone: &str) -> ToolResult {
        match self.api.get_user_appointments(phone).await {
            Ok(data) => ToolResult::ok(data),
            Err(e) => {
                tracing::error!(error = %e, "get_user_appointments failed");
                backend_unavailable()
            }
        }
    }

    async fn cancel_appointment(&self, args: CancelArgs) -> ToolResult {
        let id = match &args.appointment_id {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            other => return invalid_arguments(format!("appointment_id: {other}")),
        };

        match self.api.cancel_appointment(&id, &args.phone).await {
            Ok(reply) if reply.success => ToolResult::ok(reply.data.unwrap_or_else(|| json!({}))),
            Ok(reply) => ToolResult::failure(
                "CANCEL_FAILED",
                format!("取消预约失败: {}", reply.error_text()),
                "请确认预约编号和预约时使用的手机号是否正确",
            ),
            Err(e) => {
                tracing::error!(error = %e, appointment_id = %id, "cancel_appointment failed");
                backend_unavailable()
            }
        }
    }
}

#[async_trait]
impl ToolExecutor for BookingTools {
    fn definitions(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition::function(
                "get_stores",
                "获取所有门店列表信息，包括门店名称、地址等",
                json!({ "type": "object", "properties": {}, "required": [] }),
            ),
            ToolDefinition::function(
                "search_therapists",
                "搜索技师信息，支持按门店ID、专长关键词、最少从业年限等条件搜索",
                json!({
                    "type": "object",
                    "properties": {
                        "store_id": { "type": "integer", "description": "门店ID，用于搜索指定门店的技师" },
                        "specialty": { "type": "string", "description": "专长关键词，如：按摩、推拿、艾灸等" },
                        "min_experience": { "type": "integer", "description": "最少从业年限" },
                        "page": { "type": "integer", "description": "页码，默认1" },
                        "limit": { "type": "integer", "description": "每页数量，默认20" }
                    },
                    "required": []
                }),
            ),
            ToolDefinition::function(
                "create_smart_appointment",
                "智能预约：根据技师姓名和时间创建预约，时间冲突、技师或门店不存在等情况会返回具体原因和建议。可以直接传结构化字段，也可以传客户原话和对话上下文",
                json!({
                    "type": "object",
                    "properties": {
                        "therapist_name": { "type": "string", "description": "技师姓名，例如：'马老师'、'张师傅'" },
                        "appointment_time": { "type": "string", "description": "预约时间，格式：HH:MM，例如：'16:30'" },
                        "customer_name": { "type": "string", "description": "客户姓名" },
                        "customer_phone": { "type": "string", "description": "客户11位手机号，预约必填" },
                        "store_name": { "type": "string", "description": "门店名称，例如：'名医堂·颈肩腰腿特色调理（静安寺店）'" },
                        "appointment_date": { "type": "string", "description": "预约日期，格式：YYYY-MM-DD，默认今天" },
                        "notes": { "type": "string", "description": "备注信息，可选" },
                        "customer_message": { "type": "string", "description": "客户的原始预约请求（自然语言模式）" },
                        "context_info": {
                            "type": "object",
                            "description": "对话上下文信息（自然语言模式）",
                            "properties": {
                                "shopName": { "type": "string", "description": "门店名称" },
                                "contactName": { "type": "string", "description": "联系人名称" },
                                "combinedName": { "type": "string", "description": "\"门店 - 联系人\" 组合名称" },
                                "phone": { "type": "string", "description": "联系电话" }
                            }
                        }
                    },
                    "required": []
                }),
            ),
            ToolDefinition::function(
                "get_user_appointments",
                "查看指定用户的所有预约列表，通过手机号查询",
                json!({
                    "type": "object",
                    "properties": {
                        "phone": { "type": "string", "description": "用户电话号码" }
                    },
                    "required": ["phone"]
                }),
            ),
            ToolDefinition::function(
                "cancel_appointment",
                "取消指定的预约，需要提供预约ID和用户电话进行身份验证",
                json!({
                    "type": "object",
                    "properties": {
                        "appointment_id": { "type": "string", "description": "预约ID" },
                        "phone": { "type": "string", "description": "用户电话号码，用于验证身份" }
                    },
                    "required": ["appointment_id", "phone"]
                }),
            ),
        ]
    }

    async fn execute(&self, name: &str, arguments: Value) -> ToolResult {
        tracing::info!(tool = name, "executing tool");
        let result = match name {
            "get_stores" => self.get_stores().await,
            "search_therapists" => match args::<TherapistQuery>(arguments) {
                Ok(query) => self.search_therapists(query).await,
                Err(failure) => failure,
            },
            "create_smart_appointment" => match args::<CreateSmartAppointmentArgs>(arguments) {
                Ok(a) => self.create_smart_appointment(a).await,
                Err(failure) => failure,
            },
            "get_user_appointments" => match args::<PhoneArgs>(arguments) {
                Ok(a) => self.get_user_appointments(&a.phone).await,
                Err(failure) => failure,
            },
            "cancel_appointment" => match args::<CancelArgs>(arguments) {
                Ok(a) => self.cancel_appointment(a).await,
                Err(failure) => failure,
            },
            other => ToolResult::failure(
                "UNKNOWN_TOOL",
                format!("未知的工具: {other}"),
                "请使用 get_stores、search_therapists、create_smart_appointment、get_user_appointments 或 cancel_appointment",
            ),
        };
        if !result.success {
            tracing::warn!(tool = name, error = ?result.error, "tool call failed");
        }
        result
    }
}
