// ABOUTME: End-to-end scenarios for the incremental renderer
// ABOUTME: Text streaming, buffer overflow, and state snapshot-then-delta
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use agentflow_stream::config::RendererConfig;
use agentflow_stream::error::StreamError;
use agentflow_stream::renderer::{RenderEngine, Role, UiEvent};
use json_patch::Patch;
use serde_json::{json, Value};

#[test]
fn text_streaming_accumulates_and_completes() {
    let engine = RenderEngine::new(RendererConfig::default());

    engine
        .apply(UiEvent::TextMessageStart {
            id: "msg-1".to_string(),
            role: Role::Assistant,
        })
        .unwrap();
    engine
        .apply(UiEvent::TextMessageContent {
            id: "msg-1".to_string(),
            delta: b"Hello ".to_vec(),
        })
        .unwrap();
    engine
        .apply(UiEvent::TextMessageContent {
            id: "msg-1".to_string(),
            delta: b"world!".to_vec(),
        })
        .unwrap();
    engine
        .apply(UiEvent::TextMessageEnd {
            id: "msg-1".to_string(),
        })
        .unwrap();

    let message = engine.message("msg-1").expect("message exists");
    assert_eq!(message.content_str(), "Hello world!");
    assert!(message.complete);
}

#[test]
fn buffer_overflow_rejects_content_and_keeps_message_incomplete() {
    let config = RendererConfig {
        max_buffer_size: 10,
        ..RendererConfig::default()
    };
    let engine = RenderEngine::new(config);

    engine
        .apply(UiEvent::TextMessageStart {
            id: "msg-1".to_string(),
            role: Role::Assistant,
        })
        .unwrap();

    let err = engine
        .apply(UiEvent::TextMessageContent {
            id: "msg-1".to_string(),
            delta: b"This is too long".to_vec(),
        })
        .unwrap_err();
    assert!(matches!(err, StreamError::BufferOverflow { .. }));

    let message = engine.message("msg-1").expect("message exists");
    assert!(!message.complete);
    assert!(message.content_str().len() <= 10);
}

#[test]
fn state_snapshot_then_delta_merges_and_bumps_version() {
    let engine = RenderEngine::new(RendererConfig::default());

    engine
        .apply(UiEvent::StateSnapshot {
            state: json!({"count": 1, "name": "x"}),
        })
        .unwrap();

    let patch: Patch = serde_json::from_value(json!([
        {"op": "replace", "path": "/count", "value": 2},
        {"op": "add", "path": "/flag", "value": true},
    ]))
    .unwrap();
    engine.apply(UiEvent::StateDelta { patch }).unwrap();

    let (version, state) = engine.state_view();
    assert_eq!(version, 2);
    let expected: Value = json!({"count": 2, "name": "x", "flag": true});
    assert_eq!(state, expected);
}
