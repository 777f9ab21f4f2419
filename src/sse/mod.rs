// ABOUTME: SSE transport core — frame parser, event dispatcher, and reconnecting client
// ABOUTME: Components A, B, C from the design: bytes in, typed frames out, faults survived

pub mod client;
pub mod dispatcher;
pub mod frame;

pub use client::{ReconnectingClient, SseConnector};
pub use dispatcher::EventDispatcher;
pub use frame::{Frame, FrameParser};
