// ABOUTME: Renders applied effects to an output sink per the configured output mode
// ABOUTME: Pretty is flicker-free human text, JSON is line-delimited and deterministic, Quiet is silent
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::io::Write;

use serde_json::json;

use crate::config::OutputMode;

use super::engine::Effect;
use super::event::UiEvent;

/// Writes one rendered line per applied event, honoring the configured
/// output mode. Holds no state of its own beyond the sink and mode so it can
/// be recreated cheaply per connection.
pub struct OutputWriter<W: Write> {
    sink: W,
    mode: OutputMode,
    no_color: bool,
}

impl<W: Write> OutputWriter<W> {
    #[must_use]
    pub fn new(sink: W, mode: OutputMode, no_color: bool) -> Self {
        Self { sink, mode, no_color }
    }

    /// Renders one event/effect pair. Errors from the sink itself (a broken
    /// pipe, say) are the caller's to handle; rendering logic never panics.
    pub fn render(&mut self, event: &UiEvent, effect: &Effect) -> std::io::Result<()> {
        match self.mode {
            OutputMode::Quiet => Ok(()),
            OutputMode::Json => self.render_json(event, effect),
            OutputMode::Pretty => self.render_pretty(event, effect),
        }
    }

    /// Renders a fatal error. Quiet mode still surfaces these, per the
    /// "suppresses all output except fatal errors" contract.
    pub fn render_fatal(&mut self, message: &str) -> std::io::Result<()> {
        match self.mode {
            OutputMode::Json => {
                let line = json!({"event": "FATAL", "data": {"message": message}});
                writeln!(self.sink, "{line}")
            }
            OutputMode::Pretty | OutputMode::Quiet => {
                if self.no_color {
                    writeln!(self.sink, "fatal: {message}")
                } else {
                    writeln!(self.sink, "\x1b[31mfatal:\x1b[0m {message}")
                }
            }
        }
    }

    fn render_json(&mut self, event: &UiEvent, effect: &Effect) -> std::io::Result<()> {
        let line = json!({
            "event": event.name(),
            "data": effect_summary(effect),
        });
        writeln!(self.sink, "{line}")
    }

    fn render_pretty(&mut self, _event: &UiEvent, effect: &Effect) -> std::io::Result<()> {
        let line = match effect {
            Effect::MessageStarted { id } => format!("[{id}] message started"),
            Effect::MessageAppended { id, len } => format!("[{id}] +{len} bytes"),
            Effect::MessageEnded { id } => format!("[{id}] message complete"),
            Effect::ToolCallStarted { id, name } => format!("[{id}] tool call {name} started"),
            Effect::ToolCallArgsAttached { id } => format!("[{id}] tool call args attached"),
            Effect::ToolCallEnded { id } => format!("[{id}] tool call ended"),
            Effect::ToolCallResulted { id } => format!("[{id}] tool call resulted"),
            Effect::ThinkingStarted { id } => format!("[{id}] thinking..."),
            Effect::ThinkingAppended { id } => format!("[{id}] thinking (cont.)"),
            Effect::ThinkingEnded { id } => format!("[{id}] thinking done"),
            Effect::StateReplaced { version } => format!("state replaced (v{version})"),
            Effect::StatePatched { version } => format!("state patched (v{version})"),
            Effect::MessagesReplaced { count } => format!("{count} messages replaced"),
            Effect::Ignored { event } => format!("(ignored {event})"),
        };
        if self.no_color {
            writeln!(self.sink, "{line}")
        } else {
            writeln!(self.sink, "\x1b[2m{line}\x1b[0m")
        }
    }
}

fn effect_summary(effect: &Effect) -> serde_json::Value {
    match effect {
        Effect::MessageStarted { id } => json!({"kind": "message_started", "id": id}),
        Effect::MessageAppended { id, len } => json!({"kind": "message_appended", "id": id, "len": len}),
        Effect::MessageEnded { id } => json!({"kind": "message_ended", "id": id}),
        Effect::ToolCallStarted { id, name } => json!({"kind": "tool_call_started", "id": id, "name": name}),
        Effect::ToolCallArgsAttached { id } => json!({"kind": "tool_call_args_attached", "id": id}),
        Effect::ToolCallEnded { id } => json!({"kind": "tool_call_ended", "id": id}),
        Effect::ToolCallResulted { id } => json!({"kind": "tool_call_resulted", "id": id}),
        Effect::ThinkingStarted { id } => json!({"kind": "thinking_started", "id": id}),
        Effect::ThinkingAppended { id } => json!({"kind": "thinking_appended", "id": id}),
        Effect::ThinkingEnded { id } => json!({"kind": "thinking_ended", "id": id}),
        Effect::StateReplaced { version } => json!({"kind": "state_replaced", "version": version}),
        Effect::StatePatched { version } => json!({"kind": "state_patched", "version": version}),
        Effect::MessagesReplaced { count } => json!({"kind": "messages_replaced", "count": count}),
        Effect::Ignored { event } => json!({"kind": "ignored", "event": event}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_mode_emits_one_line_per_event() {
        let mut buf = Vec::new();
        let mut writer = OutputWriter::new(&mut buf, OutputMode::Json, true);
        let event = UiEvent::TextMessageEnd { id: "m1".into() };
        let effect = Effect::MessageEnded { id: "m1".into() };
        writer.render(&event, &effect).unwrap();
        let output = String::from_utf8(buf).unwrap();
        assert_eq!(output.lines().count(), 1);
        assert!(output.contains("\"event\":\"TEXT_MESSAGE_END\""));
    }

    #[test]
    fn quiet_mode_suppresses_normal_output_but_not_fatal() {
        let mut buf = Vec::new();
        let mut writer = OutputWriter::new(&mut buf, OutputMode::Quiet, true);
        let event = UiEvent::TextMessageEnd { id: "m1".into() };
        let effect = Effect::MessageEnded { id: "m1".into() };
        writer.render(&event, &effect).unwrap();
        assert!(buf.is_empty());

        writer.render_fatal("boom").unwrap();
        assert!(!buf.is_empty());
    }

    #[test]
    fn pretty_mode_without_color_has_no_escape_codes() {
        let mut buf = Vec::new();
        let mut writer = OutputWriter::new(&mut buf, OutputMode::Pretty, true);
        let event = UiEvent::TextMessageEnd { id: "m1".into() };
        let effect = Effect::MessageEnded { id: "m1".into() };
        writer.render(&event, &effect).unwrap();
        let output = String::from_utf8(buf).unwrap();
        assert!(!output.contains('\x1b'));
    }
}
