// ABOUTME: Main library entry point for the agent/UI streaming SDK
// ABOUTME: SSE transport, shared state engine, incremental renderer, and middleware chain

#![deny(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

//! # agentflow-stream
//!
//! A streaming transport and shared-state SDK for agent-driven UIs.
//!
//! ## Architecture
//!
//! - **`sse`** — frame parser, event dispatcher, and reconnecting client (components A, B, C)
//! - **`renderer`** — incremental UI-event renderer and output writer (component D)
//! - **`state`** — versioned shared-state store with patch-based sync (components E, F)
//! - **`ratelimit`** — token bucket, sliding window, and fixed window limiters (component G)
//! - **`resilience`** — circuit breaker and retry-with-backoff (component H)
//! - **`middleware`** — priority, dependency-ordered, and async request chains (component I)
//! - **`executor`** — bounded async worker pool (component J)
//! - **`observability`** — structured logging and in-process metrics (component K)
//! - **`validation`** — message role/size/encoding checks (component L)
//!
//! ## Example
//!
//! ```rust,no_run
//! use agentflow_stream::state::StateStore;
//! use agentflow_stream::config::StateConfig;
//! use serde_json::json;
//!
//! let store = StateStore::new(json!({"count": 0}), &StateConfig::default());
//! store.update(|current| {
//!     let mut next = current.clone();
//!     next["count"] = json!(1);
//!     next
//! }).unwrap();
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod middleware;
pub mod observability;
pub mod ratelimit;
pub mod renderer;
pub mod resilience;
pub mod sse;
pub mod state;
pub mod validation;

pub use error::{ErrorCode, ErrorDetails, StreamError, StreamResult};
