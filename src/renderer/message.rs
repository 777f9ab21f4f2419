// ABOUTME: Accumulating message and tool-call types assembled by the incremental renderer
// ABOUTME: Content buffers are append-only and bounded by maxBufferSize per the data model
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{StreamError, StreamResult};

/// Role of a message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
    Developer,
}

/// An accumulating assistant utterance. Content is append-only until `complete`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    #[serde(with = "content_as_string")]
    pub content: Vec<u8>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub complete: bool,
    #[serde(skip)]
    max_buffer_size: usize,
}

mod content_as_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&String::from_utf8_lossy(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        Ok(String::deserialize(d)?.into_bytes())
    }
}

impl Message {
    #[must_use]
    pub fn start(id: impl Into<String>, role: Role, max_buffer_size: usize) -> Self {
        Self {
            id: id.into(),
            role,
            content: Vec::new(),
            start_time: Utc::now(),
            end_time: None,
            complete: false,
            max_buffer_size,
        }
    }

    /// Append a content delta. Fails without mutating state if it would exceed
    /// `max_buffer_size`, and never panics on an already-complete message —
    /// callers must check `complete` first (the renderer enforces this).
    pub fn append(&mut self, delta: &[u8]) -> StreamResult<()> {
        let new_size = self.content.len() + delta.len();
        if new_size > self.max_buffer_size {
            return Err(StreamError::BufferOverflow {
                id: self.id.clone(),
                size: new_size,
                limit: self.max_buffer_size,
            });
        }
        self.content.extend_from_slice(delta);
        Ok(())
    }

    pub fn finish(&mut self) {
        self.complete = true;
        self.end_time = Some(Utc::now());
    }

    #[must_use]
    pub fn content_str(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }
}

/// Outcome of a tool call: exactly one of `result`/`error` is populated once set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolOutcome {
    Result(Value),
    Error(String),
}

/// A tool invocation assembled from START -> ARGS* -> END -> RESULT.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Option<Value>,
    pub outcome: Option<ToolOutcome>,
    pub ended: bool,
}

impl ToolCall {
    #[must_use]
    pub fn start(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: None,
            outcome: None,
            ended: false,
        }
    }

    /// Fully formed only after START -> ARGS* -> END has been observed.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.ended
    }
}
