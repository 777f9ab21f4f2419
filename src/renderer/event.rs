// ABOUTME: Typed UI events consumed by the incremental renderer
// ABOUTME: One variant per row of the event-to-effect table
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use json_patch::Patch;
use serde_json::Value;

use crate::error::{StreamError, StreamResult};
use crate::sse::frame::Frame;

use super::message::{Message, Role, ToolOutcome};

/// The wire schema carries no id for the reasoning stream (`THINKING_START {}`
/// has no fields) — only one can be open at a time, so it is keyed by this
/// fixed id in engine state.
pub const THINKING_STREAM_ID: &str = "thinking";

/// A single typed event arriving from the agent side of the stream.
#[derive(Debug, Clone)]
pub enum UiEvent {
    TextMessageStart { id: String, role: Role },
    TextMessageContent { id: String, delta: Vec<u8> },
    TextMessageEnd { id: String },
    ToolCallStart { id: String, name: String },
    ToolCallArgs { id: String, arguments: Value },
    ToolCallEnd { id: String },
    ToolCallResult { id: String, outcome: ToolOutcome },
    ThinkingStart { id: String },
    ThinkingContent { id: String, delta: Vec<u8> },
    ThinkingEnd { id: String },
    StateSnapshot { state: Value },
    StateDelta { patch: Patch },
    MessagesSnapshot { messages: Vec<Message> },
    /// An event name the renderer does not recognize, carried through with
    /// its raw payload so JSON-mode consumers can still observe it.
    Unknown { event: String, data: Value },
}

impl UiEvent {
    /// The event name as it would appear on the wire, used for logging and
    /// JSON-mode output.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::TextMessageStart { .. } => "TEXT_MESSAGE_START",
            Self::TextMessageContent { .. } => "TEXT_MESSAGE_CONTENT",
            Self::TextMessageEnd { .. } => "TEXT_MESSAGE_END",
            Self::ToolCallStart { .. } => "TOOL_CALL_START",
            Self::ToolCallArgs { .. } => "TOOL_CALL_ARGS",
            Self::ToolCallEnd { .. } => "TOOL_CALL_END",
            Self::ToolCallResult { .. } => "TOOL_CALL_RESULT",
            Self::ThinkingStart { .. } => "THINKING_START",
            Self::ThinkingContent { .. } => "THINKING_CONTENT",
            Self::ThinkingEnd { .. } => "THINKING_END",
            Self::StateSnapshot { .. } => "STATE_SNAPSHOT",
            Self::StateDelta { .. } => "STATE_DELTA",
            Self::MessagesSnapshot { .. } => "MESSAGES_SNAPSHOT",
            Self::Unknown { event, .. } => event,
        }
    }
}

impl TryFrom<&Frame> for UiEvent {
    type Error = StreamError;

    fn try_from(frame: &Frame) -> Result<Self, Self::Error> {
        decode(&frame.event, &frame.data)
    }
}

fn invalid(event: &str, reason: impl Into<String>) -> StreamError {
    StreamError::InvalidPayload {
        event: event.to_string(),
        reason: reason.into(),
    }
}

fn field<'a>(payload: &'a Value, event: &str, name: &str) -> StreamResult<&'a Value> {
    payload.get(name).ok_or_else(|| invalid(event, format!("missing field '{name}'")))
}

fn string_field(payload: &Value, event: &str, name: &str) -> StreamResult<String> {
    field(payload, event, name)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| invalid(event, format!("field '{name}' is not a string")))
}

/// Decodes a raw `(event name, JSON payload bytes)` pair into a [`UiEvent`],
/// per the wire schema. An event name this crate does not recognize becomes
/// `UiEvent::Unknown` rather than an error, so informational events
/// (`RUN_STARTED`, `RUN_FINISHED`, `RUN_ERROR`) and future additions pass
/// through instead of failing the stream.
pub fn decode(event: &str, data: &[u8]) -> StreamResult<UiEvent> {
    let payload: Value = if data.is_empty() {
        Value::Object(serde_json::Map::new())
    } else {
        serde_json::from_slice(data).map_err(|e| invalid(event, e.to_string()))?
    };

    match event {
        "TEXT_MESSAGE_START" => Ok(UiEvent::TextMessageStart {
            id: string_field(&payload, event, "messageId")?,
            role: serde_json::from_value(field(&payload, event, "role")?.clone())
                .map_err(|e| invalid(event, e.to_string()))?,
        }),
        "TEXT_MESSAGE_CONTENT" | "TEXT_MESSAGE_CHUNK" => Ok(UiEvent::TextMessageContent {
            id: string_field(&payload, event, "messageId")?,
            delta: string_field(&payload, event, "content")?.into_bytes(),
        }),
        "TEXT_MESSAGE_END" => Ok(UiEvent::TextMessageEnd {
            id: string_field(&payload, event, "messageId")?,
        }),
        "TOOL_CALL_START" => Ok(UiEvent::ToolCallStart {
            id: string_field(&payload, event, "toolCallId")?,
            name: string_field(&payload, event, "toolName")?,
        }),
        "TOOL_CALL_ARGS" => Ok(UiEvent::ToolCallArgs {
            id: string_field(&payload, event, "toolCallId")?,
            arguments: field(&payload, event, "arguments")?.clone(),
        }),
        "TOOL_CALL_END" => Ok(UiEvent::ToolCallEnd {
            id: string_field(&payload, event, "toolCallId")?,
        }),
        "TOOL_CALL_RESULT" => {
            let id = string_field(&payload, event, "toolCallId")?;
            let outcome = if let Some(result) = payload.get("result") {
                ToolOutcome::Result(result.clone())
            } else if let Some(error) = payload.get("error") {
                ToolOutcome::Error(error.as_str().unwrap_or_default().to_string())
            } else {
                return Err(invalid(event, "missing 'result' or 'error' field"));
            };
            Ok(UiEvent::ToolCallResult { id, outcome })
        }
        "THINKING_START" => Ok(UiEvent::ThinkingStart {
            id: THINKING_STREAM_ID.to_string(),
        }),
        "THINKING_TEXT_MESSAGE_CONTENT" | "THINKING_CONTENT" => Ok(UiEvent::ThinkingContent {
            id: THINKING_STREAM_ID.to_string(),
            delta: string_field(&payload, event, "content")?.into_bytes(),
        }),
        "THINKING_END" => Ok(UiEvent::ThinkingEnd {
            id: THINKING_STREAM_ID.to_string(),
        }),
        "STATE_SNAPSHOT" => Ok(UiEvent::StateSnapshot { state: payload }),
        "STATE_DELTA" => {
            let patch: Patch = serde_json::from_value(payload).map_err(|e| invalid(event, e.to_string()))?;
            Ok(UiEvent::StateDelta { patch })
        }
        "MESSAGES_SNAPSHOT" => {
            let messages: Vec<Message> = serde_json::from_value(field(&payload, event, "messages")?.clone())
                .map_err(|e| invalid(event, e.to_string()))?;
            Ok(UiEvent::MessagesSnapshot { messages })
        }
        _ => Ok(UiEvent::Unknown { event: event.to_string(), data: payload }),
    }
}

#[cfg(test)]
mod decode_tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_message_start_decodes_role_and_id() {
        let data = json!({"messageId": "m1", "role": "assistant"}).to_string();
        let event = decode("TEXT_MESSAGE_START", data.as_bytes()).unwrap();
        assert!(matches!(event, UiEvent::TextMessageStart { id, role: Role::Assistant } if id == "m1"));
    }

    #[test]
    fn chunk_decodes_identically_to_content() {
        let data = json!({"messageId": "m1", "content": "hi"}).to_string();
        let chunk = decode("TEXT_MESSAGE_CHUNK", data.as_bytes()).unwrap();
        let content = decode("TEXT_MESSAGE_CONTENT", data.as_bytes()).unwrap();
        assert!(matches!(
            (chunk, content),
            (
                UiEvent::TextMessageContent { id: a, delta: da },
                UiEvent::TextMessageContent { id: b, delta: db }
            ) if a == b && da == db
        ));
    }

    #[test]
    fn tool_call_result_prefers_result_over_error() {
        let data = json!({"toolCallId": "t1", "result": {"ok": true}}).to_string();
        let event = decode("TOOL_CALL_RESULT", data.as_bytes()).unwrap();
        assert!(matches!(event, UiEvent::ToolCallResult { outcome: ToolOutcome::Result(_), .. }));
    }

    #[test]
    fn tool_call_result_without_result_or_error_is_rejected() {
        let data = json!({"toolCallId": "t1"}).to_string();
        let err = decode("TOOL_CALL_RESULT", data.as_bytes()).unwrap_err();
        assert!(matches!(err, StreamError::InvalidPayload { .. }));
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let data = json!({"role": "assistant"}).to_string();
        let err = decode("TEXT_MESSAGE_START", data.as_bytes()).unwrap_err();
        assert!(matches!(err, StreamError::InvalidPayload { .. }));
    }

    #[test]
    fn state_delta_decodes_a_patch_array() {
        let data = json!([{"op": "replace", "path": "/count", "value": 2}]).to_string();
        let event = decode("STATE_DELTA", data.as_bytes()).unwrap();
        assert!(matches!(event, UiEvent::StateDelta { .. }));
    }

    #[test]
    fn unrecognized_event_becomes_unknown_not_an_error() {
        let event = decode("RUN_STARTED", b"{}").unwrap();
        assert!(matches!(event, UiEvent::Unknown { .. }));
    }
}
