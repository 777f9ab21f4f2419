// ABOUTME: Request/Response data types threaded through the middleware chain
// ABOUTME: Metadata carries cross-stage state under standardized keys
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Standardized metadata key for the authenticated caller's identity and
/// scopes, attached by an authentication stage for downstream stages to read.
pub const AUTH_CONTEXT: &str = "auth_context";
/// Standardized metadata key for the per-request correlation id used to tie
/// logs together across stages and services.
pub const CORRELATION_ID: &str = "correlation_id";
/// Standardized metadata key for the distributed trace id, if tracing is active.
pub const TRACE_ID: &str = "trace_id";
/// Standardized metadata key for the resolved client IP (see rate-limit key derivation).
pub const CLIENT_IP: &str = "client_ip";

pub type Metadata = HashMap<String, Value>;

#[derive(Debug, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub metadata: Metadata,
    pub timestamp: DateTime<Utc>,
}

impl Request {
    #[must_use]
    pub fn new(id: impl Into<String>, method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            method: method.into(),
            path: path.into(),
            headers: HashMap::new(),
            body: Vec::new(),
            metadata: Metadata::new(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    pub id: String,
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub error: Option<String>,
    pub metadata: Metadata,
    pub timestamp: DateTime<Utc>,
    pub duration: Duration,
}

impl Response {
    #[must_use]
    pub fn ok(id: impl Into<String>, body: Vec<u8>, duration: Duration) -> Self {
        Self {
            id: id.into(),
            status_code: 200,
            headers: HashMap::new(),
            body,
            error: None,
            metadata: Metadata::new(),
            timestamp: Utc::now(),
            duration,
        }
    }

    #[must_use]
    pub fn error(id: impl Into<String>, status_code: u16, message: impl Into<String>, duration: Duration) -> Self {
        Self {
            id: id.into(),
            status_code,
            headers: HashMap::new(),
            body: Vec::new(),
            error: Some(message.into()),
            metadata: Metadata::new(),
            timestamp: Utc::now(),
            duration,
        }
    }
}
