// ABOUTME: Incremental UI-event renderer — component D of the streaming SDK
// ABOUTME: Consumes typed events and maintains per-session message, tool-call and state views
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

mod engine;
mod event;
mod message;
mod output;

pub use engine::{Effect, RenderEngine};
pub use event::{decode as decode_event, UiEvent, THINKING_STREAM_ID};
pub use message::{Message, Role, ToolCall, ToolOutcome};
pub use output::OutputWriter;
