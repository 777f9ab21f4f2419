// ABOUTME: Message validation — component L: role/size/encoding checks and basic sanitization
// ABOUTME: Consulted before a renderer event or externally-submitted patch is accepted
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use crate::error::{ErrorDetails, StreamError};
use crate::renderer::Role;

/// Validates a message's role/content before it enters the renderer.
/// `max_size` is the same cap the renderer enforces on the accumulated
/// buffer, checked here up front so obviously-oversized content never
/// reaches the buffer at all.
pub fn validate_message(role: Role, content: &[u8], max_size: usize) -> Result<(), StreamError> {
    validate_role(role)?;
    validate_size(content, max_size)?;
    validate_utf8(content)?;
    Ok(())
}

/// Every declared `Role` is currently valid; this exists as the seam a
/// future tenant-specific role allowlist would hook into.
fn validate_role(_role: Role) -> Result<(), StreamError> {
    Ok(())
}

fn validate_size(content: &[u8], max_size: usize) -> Result<(), StreamError> {
    if content.len() > max_size {
        return Err(StreamError::Validation(format!(
            "content size {} exceeds limit {}",
            content.len(),
            max_size
        )));
    }
    Ok(())
}

/// Message content is carried as UTF-8 on the wire; reject anything that
/// would silently lose data via lossy conversion downstream.
fn validate_utf8(content: &[u8]) -> Result<(), StreamError> {
    std::str::from_utf8(content)
        .map(|_| ())
        .map_err(|e| StreamError::Validation(format!("content is not valid UTF-8: {e}")))
}

/// Strips ASCII control characters (other than common whitespace) from
/// user-supplied text before it is echoed back in logs or UI chrome that
/// does not expect raw control bytes.
#[must_use]
pub fn sanitize_control_chars(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect()
}

/// A JSON Pointer path reaching into the state store's own bookkeeping
/// (`/version`, `/__*`) is never valid for an externally-submitted patch.
#[must_use]
pub fn validate_patch_paths(paths: &[String]) -> Result<(), StreamError> {
    for path in paths {
        if crate::state::is_forbidden_path(path) {
            return Err(StreamError::ForbiddenPath(path.clone()));
        }
    }
    Ok(())
}

/// Builds the structured detail attached to a size-limit validation failure,
/// for callers that want to report the offending size/limit to the client.
#[must_use]
pub fn size_violation_details(id: impl Into<String>, size: usize, limit: usize) -> ErrorDetails {
    ErrorDetails {
        id: Some(id.into()),
        ..ErrorDetails::with_size_limit(size, limit)
    }
}
