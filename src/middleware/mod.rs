// ABOUTME: Middleware chain — component H of the streaming SDK
// ABOUTME: Three chain variants share the same Request/Response data model: priority, dependency, async
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

mod async_chain;
mod chain;
mod dependency;
mod request;

pub use async_chain::AsyncChain;
pub use chain::{Chain, ChainBuilder, Next, Stage};
pub use dependency::{Condition, Declaration, DependencyChain, DependencyStage};
pub use request::{Metadata, Request, Response, AUTH_CONTEXT, CLIENT_IP, CORRELATION_ID, TRACE_ID};
