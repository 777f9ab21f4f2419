// ABOUTME: Routes parsed SSE frames to registered handlers by event name
// ABOUTME: Component B: a {name -> handler} map plus a `*` default, sequential per stream
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::sync::Arc;

use dashmap::DashMap;

use crate::renderer::{decode_event, RenderEngine};

use super::frame::Frame;

/// A handler invoked with `(event_name, raw_data)`. Handler errors are logged
/// and do not stop dispatch of subsequent frames.
pub type Handler = Arc<dyn Fn(&str, &[u8]) -> anyhow::Result<()> + Send + Sync>;

const DEFAULT_HANDLER_KEY: &str = "*";

/// Maps event names to handlers. Registration is safe for concurrent use;
/// dispatch of a single stream's frames must be driven sequentially by the
/// caller so handler invocation order follows frame arrival order.
#[derive(Default, Clone)]
pub struct EventDispatcher {
    handlers: Arc<DashMap<String, Handler>>,
}

impl EventDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(DashMap::new()),
        }
    }

    /// Register a handler for a specific event name.
    pub fn on(&self, event: impl Into<String>, handler: Handler) {
        self.handlers.insert(event.into(), handler);
    }

    /// Register the `*` default handler, invoked when no specific handler matches.
    pub fn on_default(&self, handler: Handler) {
        self.handlers.insert(DEFAULT_HANDLER_KEY.to_string(), handler);
    }

    /// Dispatch a single frame. Returns `true` if a handler (specific or
    /// default) was found and invoked. Handler errors are logged, not propagated.
    pub fn dispatch(&self, frame: &Frame) -> bool {
        let handler = self
            .handlers
            .get(&frame.event)
            .map(|h| h.clone())
            .or_else(|| self.handlers.get(DEFAULT_HANDLER_KEY).map(|h| h.clone()));

        let Some(handler) = handler else {
            tracing::debug!(event = %frame.event, "no handler registered");
            return false;
        };

        if let Err(err) = handler(&frame.event, &frame.data) {
            tracing::warn!(event = %frame.event, error = %err, "handler returned an error, continuing");
        }
        true
    }

    /// Dispatch a whole batch in arrival order.
    pub fn dispatch_all(&self, frames: &[Frame]) {
        for frame in frames {
            self.dispatch(frame);
        }
    }

    /// Registers the default handler that decodes every frame into a
    /// [`UiEvent`](crate::renderer::UiEvent) and feeds it to `engine`. This is
    /// the seam connecting the transport (components A/B/C) to the renderer
    /// and state store (components D/E): register it once per stream and
    /// every dispatched frame drives the engine's accumulating view.
    pub fn render_into(&self, engine: Arc<RenderEngine>) {
        self.on_default(Arc::new(move |event, data| {
            let ui_event = decode_event(event, data)?;
            engine.apply(ui_event)?;
            Ok(())
        }));
    }
}
