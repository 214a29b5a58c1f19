//! Server-sent events emitted while a run streams, and the payload shapes
//! the adapter cares about.

use crate::domain::models::{RunRef, ToolCallRequest};
use crate::error::{ChatError, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

pub const RUN_CREATED: &str = "thread.run.created";
pub const RUN_QUEUED: &str = "thread.run.queued";
pub const RUN_IN_PROGRESS: &str = "thread.run.in_progress";
pub const RUN_REQUIRES_ACTION: &str = "thread.run.requires_action";
pub const RUN_COMPLETED: &str = "thread.run.completed";
pub const RUN_FAILED: &str = "thread.run.failed";
pub const RUN_CANCELLED: &str = "thread.run.cancelled";
pub const RUN_EXPIRED: &str = "thread.run.expired";
pub const RUN_INCOMPLETE: &str = "thread.run.incomplete";
pub const MESSAGE_DELTA: &str = "thread.message.delta";
pub const MESSAGE_COMPLETED: &str = "thread.message.completed";
pub const MESSAGE_INCOMPLETE: &str = "thread.message.incomplete";
pub const DONE: &str = "done";
pub const ERROR: &str = "error";

const SUBMIT_TOOL_OUTPUTS: &str = "submit_tool_outputs";

/// One SSE frame: the `event:` name and its decoded `data:` payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerEvent {
    pub event: String,
    pub data: Value,
}

impl ServerEvent {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    pub fn done() -> Self {
        Self::new(DONE, Value::Null)
    }

    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.data.clone())
            .map_err(|e| ChatError::Protocol(format!("malformed '{}' payload: {}", self.event, e)))
    }
}

#[derive(Debug, Deserialize)]
pub struct RunObject {
    pub id: String,
    pub thread_id: String,
    #[serde(default)]
    pub required_action: Option<RequiredAction>,
    #[serde(default)]
    pub last_error: Option<RunError>,
    #[serde(default)]
    pub incomplete_details: Option<IncompleteDetails>,
}

impl RunObject {
    pub fn run_ref(&self) -> RunRef {
        RunRef {
            thread_id: self.thread_id.clone(),
            run_id: self.id.clone(),
        }
    }

    /// Tool calls of a `submit_tool_outputs` action, if that is what the run waits on
    pub fn pending_tool_calls(&self) -> Option<Vec<ToolCallRequest>> {
        let action = self.required_action.as_ref()?;
        if action.kind != SUBMIT_TOOL_OUTPUTS {
            return None;
        }
        let calls = action
            .submit_tool_outputs
            .as_ref()
            .map(|s| s.tool_calls.iter().map(WireToolCall::to_request).collect())
            .unwrap_or_default();
        Some(calls)
    }
}

#[derive(Debug, Deserialize)]
pub struct RequiredAction {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub submit_tool_outputs: Option<SubmitToolOutputs>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitToolOutputs {
    #[serde(default)]
    pub tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
pub struct WireToolCall {
    pub id: String,
    pub function: WireFunction,
}

#[derive(Debug, Deserialize)]
pub struct WireFunction {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

impl WireToolCall {
    fn to_request(&self) -> ToolCallRequest {
        let arguments: Value =
            serde_json::from_str(&self.function.arguments).unwrap_or(json!({}));
        ToolCallRequest {
            id: self.id.clone(),
            name: self.function.name.clone(),
            arguments,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RunError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Why a run stopped short, e.g. `max_completion_tokens`
#[derive(Debug, Deserialize)]
pub struct IncompleteDetails {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MessageDelta {
    pub id: String,
    pub delta: MessageDeltaBody,
}

#[derive(Debug, Deserialize)]
pub struct MessageDeltaBody {
    #[serde(default)]
    pub content: Vec<DeltaContent>,
}

#[derive(Debug, Deserialize)]
pub struct DeltaContent {
    pub index: usize,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<DeltaText>,
}

#[derive(Debug, Deserialize)]
pub struct DeltaText {
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MessageObject {
    #[serde(default)]
    pub content: Vec<MessageContent>,
}

#[derive(Debug, Deserialize)]
pub struct MessageContent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<TextContent>,
}

#[derive(Debug, Deserialize)]
pub struct TextContent {
    pub value: String,
}

/// Error frames carry `{"error": {...}}` or the error object itself
pub fn error_message(data: &Value) -> String {
    let inner = data.get("error").unwrap_or(data);
    inner
        .get("message")
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| data.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_action_payload() {
        let event = ServerEvent::new(
            RUN_REQUIRES_ACTION,
            json!({
                "id": "run_1",
                "thread_id": "thread_1",
                "status": "requires_action",
                "required_action": {
                    "type": "submit_tool_outputs",
                    "submit_tool_outputs": {
                        "tool_calls": [
                            { "id": "call_a", "type": "function", "function": { "name": "get_cat", "arguments": "{}" } },
                            { "id": "call_b", "type": "function", "function": { "name": "get_cat", "arguments": "" } }
                        ]
                    }
                }
            }),
        );

        let run: RunObject = event.parse().unwrap();
        assert_eq!(
            run.run_ref(),
            RunRef {
                thread_id: "thread_1".into(),
                run_id: "run_1".into()
            }
        );

        let calls = run.pending_tool_calls().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "call_a");
        assert_eq!(calls[1].name, "get_cat");
        // Empty argument strings decode to an empty object
        assert_eq!(calls[1].arguments, json!({}));
    }

    #[test]
    fn test_other_actions_are_not_tool_calls() {
        let run: RunObject = serde_json::from_value(json!({
            "id": "run_1",
            "thread_id": "thread_1",
            "required_action": { "type": "something_else" }
        }))
        .unwrap();
        assert!(run.pending_tool_calls().is_none());
    }

    #[test]
    fn test_incomplete_run_reason() {
        let run: RunObject = serde_json::from_value(json!({
            "id": "run_1",
            "thread_id": "thread_1",
            "status": "incomplete",
            "incomplete_details": { "reason": "max_completion_tokens" }
        }))
        .unwrap();
        assert_eq!(
            run.incomplete_details.and_then(|d| d.reason).as_deref(),
            Some("max_completion_tokens")
        );
    }

    #[test]
    fn test_malformed_payload_is_protocol_error() {
        let event = ServerEvent::new(MESSAGE_DELTA, json!({ "nope": true }));
        let err = event.parse::<MessageDelta>().unwrap_err();
        assert!(matches!(err, ChatError::Protocol(_)));
    }

    #[test]
    fn test_error_message_shapes() {
        assert_eq!(
            error_message(&json!({ "error": { "message": "rate limited" } })),
            "rate limited"
        );
        assert_eq!(error_message(&json!({ "message": "boom" })), "boom");
        assert_eq!(error_message(&json!("raw")), "\"raw\"");
    }
}
