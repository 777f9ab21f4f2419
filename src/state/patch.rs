// ABOUTME: RFC 6902 patch helpers shared by the state store and the incremental renderer
// ABOUTME: Diff, apply, and canonical-equality checks used to validate every committed update
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use json_patch::{Patch, PatchOperation};
use serde_json::Value;

use crate::error::StreamError;

/// Computes the canonical patch that transforms `old` into `new`.
#[must_use]
pub fn diff(old: &Value, new: &Value) -> Patch {
    json_patch::diff(old, new)
}

/// Applies `patch` to a clone of `doc`, returning the result without mutating
/// the input. `serde_json::Value`'s default map representation is key-order
/// stable (BTreeMap-backed), so two values that are structurally equal
/// compare equal regardless of the order their keys were inserted in —
/// satisfying the "canonical JSON serialization" requirement without extra
/// work.
pub fn apply(doc: &Value, patch: &Patch) -> Result<Value, StreamError> {
    let mut out = doc.clone();
    json_patch::patch(&mut out, patch).map_err(|e| StreamError::PatchMismatch(e.to_string()))?;
    Ok(out)
}

/// Validates that applying `patch` to `old` reproduces `new` byte-for-byte
/// after canonicalization. Used by the state store's atomic `Update` to catch
/// diff/apply bugs before committing.
pub fn validate(old: &Value, patch: &Patch, new: &Value) -> Result<(), StreamError> {
    let reapplied = apply(old, patch)?;
    if &reapplied != new {
        return Err(StreamError::PatchMismatch(
            "re-applied patch does not match expected new state".to_string(),
        ));
    }
    Ok(())
}

/// JSON Pointer paths touched by a patch, used for disjoint-path conflict
/// detection by the merge conflict-resolution strategy.
#[must_use]
pub fn touched_paths(patch: &Patch) -> Vec<String> {
    patch
        .0
        .iter()
        .map(|op| match op {
            PatchOperation::Add(o) => o.path.to_string(),
            PatchOperation::Remove(o) => o.path.to_string(),
            PatchOperation::Replace(o) => o.path.to_string(),
            PatchOperation::Move(o) => o.path.to_string(),
            PatchOperation::Copy(o) => o.path.to_string(),
            PatchOperation::Test(o) => o.path.to_string(),
        })
        .collect()
}

/// A path is "forbidden" for client-submitted patches when it targets the
/// store's own bookkeeping field rather than application data.
#[must_use]
pub fn is_forbidden_path(path: &str) -> bool {
    path == "/version" || path.starts_with("/__")
}
