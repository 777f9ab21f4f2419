// ABOUTME: Incremental UI-event renderer — component D of the streaming SDK
// ABOUTME: Single-writer mutex over a per-session message table, tool-call table and live state view
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;
use tracing::{info, warn};

use crate::config::RendererConfig;
use crate::error::{StreamError, StreamResult};
use crate::state::patch;

use super::event::UiEvent;
use super::message::{Message, ToolCall};

struct Thinking {
    buffer: Vec<u8>,
    complete: bool,
}

struct EngineState {
    messages: HashMap<String, Message>,
    tool_calls: HashMap<String, ToolCall>,
    thinking: HashMap<String, Thinking>,
    view_state: Value,
    view_version: u64,
}

/// Summary of what an applied event changed, handed to the output layer so
/// it can render without re-deriving the effect from the event itself.
#[derive(Debug, Clone)]
pub enum Effect {
    MessageStarted { id: String },
    MessageAppended { id: String, len: usize },
    MessageEnded { id: String },
    ToolCallStarted { id: String, name: String },
    ToolCallArgsAttached { id: String },
    ToolCallEnded { id: String },
    ToolCallResulted { id: String },
    ThinkingStarted { id: String },
    ThinkingAppended { id: String },
    ThinkingEnded { id: String },
    StateReplaced { version: u64 },
    StatePatched { version: u64 },
    MessagesReplaced { count: usize },
    Ignored { event: String },
}

/// Consumes typed UI events and maintains the accumulating view of a single
/// session. Safe to share across tasks: a single-writer lock serializes
/// mutations while readers (`message`, `state`) take a shared lock and never
/// observe a message mid-mutation.
pub struct RenderEngine {
    state: RwLock<EngineState>,
    config: RendererConfig,
}

impl RenderEngine {
    #[must_use]
    pub fn new(config: RendererConfig) -> Self {
        Self {
            state: RwLock::new(EngineState {
                messages: HashMap::new(),
                tool_calls: HashMap::new(),
                thinking: HashMap::new(),
                view_state: Value::Object(serde_json::Map::new()),
                view_version: 0,
            }),
            config,
        }
    }

    /// Applies one event, returning the effect it had or the error that
    /// rejected it. A rejected event never poisons the rest of the session:
    /// buffer overflow and malformed-patch errors leave prior state intact.
    pub fn apply(&self, event: UiEvent) -> StreamResult<Effect> {
        let mut guard = self
            .state
            .write()
            .map_err(|_| StreamError::Internal("render engine lock poisoned".to_string()))?;
        match event {
            UiEvent::TextMessageStart { id, role } => {
                if guard.messages.get(&id).is_some_and(|m| m.complete) {
                    return Err(StreamError::MessageAlreadyComplete { id });
                }
                guard
                    .messages
                    .insert(id.clone(), Message::start(id.clone(), role, self.config.max_buffer_size));
                Ok(Effect::MessageStarted { id })
            }
            UiEvent::TextMessageContent { id, delta } => {
                let msg = guard
                    .messages
                    .get_mut(&id)
                    .ok_or_else(|| StreamError::MessageNotFound { id: id.clone() })?;
                if msg.complete {
                    return Err(StreamError::MessageAlreadyComplete { id });
                }
                msg.append(&delta)?;
                Ok(Effect::MessageAppended { id, len: delta.len() })
            }
            UiEvent::TextMessageEnd { id } => {
                let msg = guard
                    .messages
                    .get_mut(&id)
                    .ok_or_else(|| StreamError::MessageNotFound { id: id.clone() })?;
                msg.finish();
                Ok(Effect::MessageEnded { id })
            }
            UiEvent::ToolCallStart { id, name } => {
                guard
                    .tool_calls
                    .insert(id.clone(), ToolCall::start(id.clone(), name.clone()));
                Ok(Effect::ToolCallStarted { id, name })
            }
            UiEvent::ToolCallArgs { id, arguments } => {
                let call = guard
                    .tool_calls
                    .get_mut(&id)
                    .ok_or_else(|| StreamError::MessageNotFound { id: id.clone() })?;
                call.arguments = Some(arguments);
                Ok(Effect::ToolCallArgsAttached { id })
            }
            UiEvent::ToolCallEnd { id } => {
                let call = guard
                    .tool_calls
                    .get_mut(&id)
                    .ok_or_else(|| StreamError::MessageNotFound { id: id.clone() })?;
                call.ended = true;
                Ok(Effect::ToolCallEnded { id })
            }
            UiEvent::ToolCallResult { id, outcome } => {
                let call = guard
                    .tool_calls
                    .get_mut(&id)
                    .ok_or_else(|| StreamError::MessageNotFound { id: id.clone() })?;
                call.outcome = Some(outcome);
                Ok(Effect::ToolCallResulted { id })
            }
            UiEvent::ThinkingStart { id } => {
                guard.thinking.insert(
                    id.clone(),
                    Thinking {
                        buffer: Vec::new(),
                        complete: false,
                    },
                );
                Ok(Effect::ThinkingStarted { id })
            }
            UiEvent::ThinkingContent { id, delta } => {
                let thinking = guard
                    .thinking
                    .get_mut(&id)
                    .ok_or_else(|| StreamError::MessageNotFound { id: id.clone() })?;
                let new_size = thinking.buffer.len() + delta.len();
                if new_size > self.config.max_buffer_size {
                    return Err(StreamError::BufferOverflow {
                        id,
                        size: new_size,
                        limit: self.config.max_buffer_size,
                    });
                }
                thinking.buffer.extend_from_slice(&delta);
                Ok(Effect::ThinkingAppended { id })
            }
            UiEvent::ThinkingEnd { id } => {
                let thinking = guard
                    .thinking
                    .get_mut(&id)
                    .ok_or_else(|| StreamError::MessageNotFound { id: id.clone() })?;
                thinking.complete = true;
                Ok(Effect::ThinkingEnded { id })
            }
            UiEvent::StateSnapshot { state } => {
                guard.view_state = state;
                guard.view_version += 1;
                Ok(Effect::StateReplaced {
                    version: guard.view_version,
                })
            }
            UiEvent::StateDelta { patch: delta } => {
                let applied = patch::apply(&guard.view_state, &delta)?;
                guard.view_state = applied;
                guard.view_version += 1;
                Ok(Effect::StatePatched {
                    version: guard.view_version,
                })
            }
            UiEvent::MessagesSnapshot { messages } => {
                let count = messages.len();
                guard.messages = messages.into_iter().map(|m| (m.id.clone(), m)).collect();
                Ok(Effect::MessagesReplaced { count })
            }
            UiEvent::Unknown { event, data } => {
                match self.config.output_mode {
                    crate::config::OutputMode::Json => {
                        info!(event = %event, data = %data, "forwarding unknown event");
                    }
                    crate::config::OutputMode::Pretty | crate::config::OutputMode::Quiet => {
                        warn!(event = %event, "ignoring unknown event in non-json output mode");
                    }
                }
                Ok(Effect::Ignored { event })
            }
        }
    }

    /// Reads a single message by id without blocking a concurrent writer any
    /// longer than the copy itself takes.
    #[must_use]
    pub fn message(&self, id: &str) -> Option<Message> {
        self.state.read().ok()?.messages.get(id).cloned()
    }

    #[must_use]
    pub fn state_view(&self) -> (u64, Value) {
        self.state
            .read()
            .map(|g| (g.view_version, g.view_state.clone()))
            .unwrap_or((0, Value::Null))
    }

    #[must_use]
    pub fn tool_call(&self, id: &str) -> Option<ToolCall> {
        self.state.read().ok()?.tool_calls.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::message::{Role, ToolOutcome};
    use serde_json::json;

    fn engine() -> RenderEngine {
        RenderEngine::new(RendererConfig {
            max_buffer_size: 1024,
            ..RendererConfig::default()
        })
    }

    #[test]
    fn text_message_lifecycle_accumulates_content() {
        let engine = engine();
        engine
            .apply(UiEvent::TextMessageStart {
                id: "m1".into(),
                role: Role::Assistant,
            })
            .unwrap();
        engine
            .apply(UiEvent::TextMessageContent {
                id: "m1".into(),
                delta: b"hello".to_vec(),
            })
            .unwrap();
        engine
            .apply(UiEvent::TextMessageEnd { id: "m1".into() })
            .unwrap();

        let msg = engine.message("m1").unwrap();
        assert!(msg.complete);
        assert_eq!(msg.content_str(), "hello");
    }

    #[test]
    fn restarting_a_complete_message_is_rejected() {
        let engine = engine();
        engine
            .apply(UiEvent::TextMessageStart {
                id: "m1".into(),
                role: Role::Assistant,
            })
            .unwrap();
        engine
            .apply(UiEvent::TextMessageEnd { id: "m1".into() })
            .unwrap();
        let err = engine
            .apply(UiEvent::TextMessageStart {
                id: "m1".into(),
                role: Role::Assistant,
            })
            .unwrap_err();
        assert!(matches!(err, StreamError::MessageAlreadyComplete { .. }));
    }

    #[test]
    fn content_after_end_is_rejected_and_leaves_message_untouched() {
        let engine = engine();
        engine
            .apply(UiEvent::TextMessageStart {
                id: "m1".into(),
                role: Role::Assistant,
            })
            .unwrap();
        engine
            .apply(UiEvent::TextMessageContent {
                id: "m1".into(),
                delta: b"hello".to_vec(),
            })
            .unwrap();
        engine
            .apply(UiEvent::TextMessageEnd { id: "m1".into() })
            .unwrap();

        let err = engine
            .apply(UiEvent::TextMessageContent {
                id: "m1".into(),
                delta: b" world".to_vec(),
            })
            .unwrap_err();
        assert!(matches!(err, StreamError::MessageAlreadyComplete { .. }));
        assert_eq!(engine.message("m1").unwrap().content_str(), "hello");
    }

    #[test]
    fn buffer_overflow_does_not_poison_session() {
        let engine = engine();
        engine
            .apply(UiEvent::TextMessageStart {
                id: "m1".into(),
                role: Role::Assistant,
            })
            .unwrap();
        let huge = vec![b'x'; 2048];
        let err = engine
            .apply(UiEvent::TextMessageContent {
                id: "m1".into(),
                delta: huge,
            })
            .unwrap_err();
        assert!(matches!(err, StreamError::BufferOverflow { .. }));

        engine
            .apply(UiEvent::TextMessageContent {
                id: "m1".into(),
                delta: b"ok".to_vec(),
            })
            .unwrap();
        assert_eq!(engine.message("m1").unwrap().content_str(), "ok");
    }

    #[test]
    fn tool_call_round_trip() {
        let engine = engine();
        engine
            .apply(UiEvent::ToolCallStart {
                id: "t1".into(),
                name: "search".into(),
            })
            .unwrap();
        engine
            .apply(UiEvent::ToolCallArgs {
                id: "t1".into(),
                arguments: json!({"q": "rust"}),
            })
            .unwrap();
        engine
            .apply(UiEvent::ToolCallEnd { id: "t1".into() })
            .unwrap();
        engine
            .apply(UiEvent::ToolCallResult {
                id: "t1".into(),
                outcome: ToolOutcome::Result(json!({"hits": 3})),
            })
            .unwrap();

        let call = engine.tool_call("t1").unwrap();
        assert!(call.is_well_formed());
        assert!(call.outcome.is_some());
    }

    #[test]
    fn state_snapshot_then_delta_advances_version() {
        let engine = engine();
        engine
            .apply(UiEvent::StateSnapshot {
                state: json!({"count": 1}),
            })
            .unwrap();
        let delta = json_patch::diff(&json!({"count": 1}), &json!({"count": 2}));
        engine.apply(UiEvent::StateDelta { patch: delta }).unwrap();

        let (version, state) = engine.state_view();
        assert_eq!(version, 2);
        assert_eq!(state["count"], json!(2));
    }

    #[test]
    fn malformed_delta_leaves_state_untouched() {
        let engine = engine();
        engine
            .apply(UiEvent::StateSnapshot {
                state: json!({"count": 1}),
            })
            .unwrap();
        let bogus = json_patch::Patch(vec![serde_json::from_value(json!({
            "op": "test",
            "path": "/count",
            "value": 999
        }))
        .unwrap()]);
        let err = engine.apply(UiEvent::StateDelta { patch: bogus }).unwrap_err();
        assert!(matches!(err, StreamError::PatchMismatch(_)));

        let (version, state) = engine.state_view();
        assert_eq!(version, 1);
        assert_eq!(state["count"], json!(1));
    }

    #[test]
    fn unknown_event_is_ignored_not_errored() {
        let engine = engine();
        let effect = engine
            .apply(UiEvent::Unknown {
                event: "FUTURE_EVENT".into(),
                data: json!({}),
            })
            .unwrap();
        assert!(matches!(effect, Effect::Ignored { .. }));
    }
}
