//! Message shapes exchanged with the host plugin runtime.
//!
//! Requests look like `{"tool_calls": [{"func": "chat", "params": {...},
//! "messages": [...], "system_info": {...}}]}`. Every response is a JSON
//! object followed by [`END_MARKER`].

use serde::Serialize;
use serde_json::Value;

pub const END_MARKER: &str = "<<END>>";

const TOOL_CALLS_PROPERTY: &str = "tool_calls";
const FUNCTION_PROPERTY: &str = "func";
const PARAMS_PROPERTY: &str = "params";
const CONTEXT_PROPERTY: &str = "messages";
const SYSTEM_INFO_PROPERTY: &str = "system_info";

const ERROR_MESSAGE: &str = "Plugin Error!";

/// One reply unit written back to the host.
///
/// Final statuses carry `success`. Streamed chunks carry only `message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Response {
    pub fn success() -> Self {
        Self { success: Some(true), message: None }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self { success: Some(false), message: Some(message.into()) }
    }

    pub fn message(text: impl Into<String>) -> Self {
        Self { success: None, message: Some(text.into()) }
    }

    pub fn is_success(&self) -> bool {
        self.success == Some(true)
    }
}

/// One conversation turn as supplied by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextMessage {
    pub role: String,
    pub content: String,
}

/// One decoded tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub name: String,
    pub params: Option<Value>,
    pub context: Vec<ContextMessage>,
    pub system_info: Option<Value>,
}

/// Why a request could not be turned into commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Malformed {
    MissingToolCalls,
    MissingFunction,
}

impl Malformed {
    pub fn response(&self) -> Response {
        Response::failure(format!("{ERROR_MESSAGE} Malformed input."))
    }
}

pub fn unknown_command(name: &str) -> Response {
    Response::failure(format!("{ERROR_MESSAGE} Unknown command: {name}"))
}

/// Split a request into its tool calls.
///
/// Each entry is decoded independently so one bad call does not hide the
/// others from the dispatcher.
pub fn tool_calls(request: &Value) -> Result<Vec<Result<Command, Malformed>>, Malformed> {
    let calls = request
        .get(TOOL_CALLS_PROPERTY)
        .and_then(Value::as_array)
        .ok_or(Malformed::MissingToolCalls)?;
    if calls.is_empty() {
        return Err(Malformed::MissingToolCalls);
    }
    Ok(calls.iter().map(decode_call).collect())
}

fn decode_call(call: &Value) -> Result<Command, Malformed> {
    let name = call
        .get(FUNCTION_PROPERTY)
        .and_then(Value::as_str)
        .ok_or(Malformed::MissingFunction)?;

    Ok(Command {
        name: name.to_string(),
        params: call.get(PARAMS_PROPERTY).filter(|v| !v.is_null()).cloned(),
        context: call
            .get(CONTEXT_PROPERTY)
            .map(decode_context)
            .unwrap_or_default(),
        system_info: call.get(SYSTEM_INFO_PROPERTY).cloned(),
    })
}

fn decode_context(messages: &Value) -> Vec<ContextMessage> {
    let Some(messages) = messages.as_array() else {
        return Vec::new();
    };
    messages
        .iter()
        .filter_map(|m| {
            let obj = m.as_object()?;
            Some(ContextMessage {
                role: obj
                    .get("role")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string(),
                content: obj
                    .get("content")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            })
        })
        .collect()
}
