// ABOUTME: Centralized error taxonomy shared across the transport, state, and middleware layers
// ABOUTME: Defines stable error codes and HTTP status mapping for every failure kind in the crate
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::time::Duration;

use thiserror::Error;

/// Stable, user-visible error code. Kept distinct from the `StreamError` variant
/// names so renaming an internal variant never changes the wire-visible code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Malformed SSE line, oversize line, or invalid event payload JSON.
    Protocol,
    /// Retryable network/transport fault.
    TransportRetryable,
    /// Terminal transport fault (caller must stop).
    TransportTerminal,
    /// Schema/role/size/encoding failure.
    Validation,
    /// Buffer overflow, queue full, channel full, watcher closed.
    Resource,
    /// Rate limit exceeded, circuit open, auth denied.
    Policy,
    /// Serialization failure, patch apply/validate mismatch, recovered panic.
    Internal,
}

impl ErrorCode {
    /// HTTP status class this error code maps to.
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::Protocol | Self::Validation => 400,
            Self::Policy => 429,
            Self::TransportTerminal => 502,
            Self::TransportRetryable => 503,
            Self::Resource => 507,
            Self::Internal => 500,
        }
    }
}

/// Structured detail attached to a `StreamError`, surfaced to callers so they
/// can act on the failure (which id, which path, which limit was exceeded).
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ErrorDetails {
    pub id: Option<String>,
    pub path: Option<String>,
    pub size: Option<usize>,
    pub limit: Option<usize>,
}

impl ErrorDetails {
    #[must_use]
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_size_limit(size: usize, limit: usize) -> Self {
        Self {
            id: None,
            path: None,
            size: Some(size),
            limit: Some(limit),
        }
    }
}

/// Crate-wide error type. Every fallible operation in every component returns
/// this type so callers can match on the taxonomy rather than strings.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("malformed SSE frame: {0}")]
    MalformedFrame(String),

    #[error("line exceeds buffer cap ({size} > {limit} bytes)")]
    LineTooLong { size: usize, limit: usize },

    #[error("invalid event payload for {event}: {reason}")]
    InvalidPayload { event: String, reason: String },

    #[error("transport error (retryable): {message}")]
    TransportRetryable {
        message: String,
        /// `Retry-After`-derived delay, if the server specified one. When
        /// present it overrides the computed backoff delay.
        retry_after: Option<Duration>,
    },

    #[error("transport error (terminal, status {status}): {message}")]
    TransportTerminal { status: u16, message: String },

    #[error("connection cancelled")]
    Cancelled,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("forbidden JSON pointer path: {0}")]
    ForbiddenPath(String),

    #[error("message {id} already complete")]
    MessageAlreadyComplete { id: String },

    #[error("message {id} not found")]
    MessageNotFound { id: String },

    #[error("buffer overflow on {id}: {size} > {limit} bytes")]
    BufferOverflow { id: String, size: usize, limit: usize },

    #[error("queue is full")]
    QueueFull,

    #[error("watcher channel is full, delta dropped")]
    ChannelFull,

    #[error("watcher is closed")]
    WatcherClosed,

    #[error("rate limit exceeded, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("circuit breaker open for {0}")]
    CircuitOpen(String),

    #[error("authentication denied: {0}")]
    AuthDenied(String),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("patch application mismatch: {0}")]
    PatchMismatch(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl StreamError {
    /// Build a retryable transport error with no server-specified delay.
    #[must_use]
    pub fn retryable(message: impl Into<String>) -> Self {
        Self::TransportRetryable {
            message: message.into(),
            retry_after: None,
        }
    }

    /// Build a retryable transport error carrying a `Retry-After` delay.
    #[must_use]
    pub fn retryable_after(message: impl Into<String>, retry_after: Duration) -> Self {
        Self::TransportRetryable {
            message: message.into(),
            retry_after: Some(retry_after),
        }
    }

    /// Stable taxonomy code for this error, used for logging and status mapping.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::MalformedFrame(_) | Self::LineTooLong { .. } | Self::InvalidPayload { .. } => {
                ErrorCode::Protocol
            }
            Self::TransportRetryable { .. } => ErrorCode::TransportRetryable,
            Self::TransportTerminal { .. } | Self::Cancelled => ErrorCode::TransportTerminal,
            Self::Validation(_)
            | Self::ForbiddenPath(_)
            | Self::MessageAlreadyComplete { .. }
            | Self::MessageNotFound { .. } => ErrorCode::Validation,
            Self::BufferOverflow { .. }
            | Self::QueueFull
            | Self::ChannelFull
            | Self::WatcherClosed => ErrorCode::Resource,
            Self::RateLimited { .. } | Self::CircuitOpen(_) | Self::AuthDenied(_) => {
                ErrorCode::Policy
            }
            Self::Serialization(_) | Self::PatchMismatch(_) | Self::Internal(_) => {
                ErrorCode::Internal
            }
            Self::Io(_) => ErrorCode::TransportRetryable,
        }
    }

    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.code().http_status()
    }
}

pub type StreamResult<T> = Result<T, StreamError>;

#[cfg(feature = "server")]
impl axum::response::IntoResponse for StreamError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;
        use axum::Json;

        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::json!({
            "error": self.to_string(),
            "code": format!("{:?}", self.code()),
        });
        (status, Json(body)).into_response()
    }
}
