// ABOUTME: Demo binary exercising the renderer and state store end to end
// ABOUTME: Feeds a small scripted event sequence through the engine and prints the rendered output
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::io::stdout;

use agentflow_stream::config::{OutputMode, RendererConfig};
use agentflow_stream::observability::{init_logging, LoggingConfig};
use agentflow_stream::renderer::{OutputWriter, RenderEngine, Role, UiEvent};
use anyhow::Result;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(&LoggingConfig::default());
    info!("agentflow-demo starting");

    let config = RendererConfig {
        output_mode: parse_output_mode(),
        ..RendererConfig::default()
    };
    let engine = RenderEngine::new(config.clone());
    let mut writer = OutputWriter::new(stdout(), config.output_mode, config.no_color);

    for event in scripted_events() {
        let rendered = event.clone();
        match engine.apply(event) {
            Ok(effect) => writer.render(&rendered, &effect)?,
            Err(err) => writer.render_fatal(&err.to_string())?,
        }
    }

    if let Some(message) = engine.message("m1") {
        info!(id = %message.id, complete = message.complete, "final message state");
    }

    Ok(())
}

fn parse_output_mode() -> OutputMode {
    match std::env::args().nth(1).as_deref() {
        Some("--json") => OutputMode::Json,
        Some("--quiet") => OutputMode::Quiet,
        _ => OutputMode::Pretty,
    }
}

fn scripted_events() -> Vec<UiEvent> {
    vec![
        UiEvent::TextMessageStart {
            id: "m1".to_string(),
            role: Role::Assistant,
        },
        UiEvent::TextMessageContent {
            id: "m1".to_string(),
            delta: b"Hello, ".to_vec(),
        },
        UiEvent::TextMessageContent {
            id: "m1".to_string(),
            delta: b"world!".to_vec(),
        },
        UiEvent::TextMessageEnd {
            id: "m1".to_string(),
        },
    ]
}
