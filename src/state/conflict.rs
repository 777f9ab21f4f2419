// ABOUTME: Pluggable conflict resolution for collaborative editors (component F)
// ABOUTME: Consulted when an externally-submitted patch's version precondition is stale
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::collections::HashSet;

use json_patch::Patch;
use serde_json::Value;

use super::patch::touched_paths;

/// Result of consulting a resolver when an incoming patch's expected version
/// no longer matches the store's current version.
pub enum ConflictOutcome {
    /// Apply the incoming patch against the current document as-is.
    Accept,
    /// Drop the incoming patch; the current document is left untouched.
    Reject,
}

/// Pluggable policy for resolving a stale-precondition conflict. Implementors
/// receive the patches committed since the client's expected version so they
/// can decide whether the incoming edit is safe to apply on top.
pub trait ConflictResolver: Send + Sync {
    fn resolve(&self, incoming: &Patch, committed_since: &[Patch], current: &Value) -> ConflictOutcome;
}

/// Always accepts the incoming patch, discarding whatever happened since the
/// client's expected version.
pub struct LastWriteWins;

impl ConflictResolver for LastWriteWins {
    fn resolve(&self, _incoming: &Patch, _committed_since: &[Patch], _current: &Value) -> ConflictOutcome {
        ConflictOutcome::Accept
    }
}

/// Always rejects the incoming patch once any conflicting commit has landed.
pub struct FirstWriteWins;

impl ConflictResolver for FirstWriteWins {
    fn resolve(&self, _incoming: &Patch, committed_since: &[Patch], _current: &Value) -> ConflictOutcome {
        if committed_since.is_empty() {
            ConflictOutcome::Accept
        } else {
            ConflictOutcome::Reject
        }
    }
}

/// Three-way merge on disjoint paths: accepts the incoming patch only if it
/// touches none of the paths modified since the client's expected version.
/// An overlapping patch is rejected rather than silently applied on top of
/// edits it never saw.
pub struct MergeDisjointPaths;

impl ConflictResolver for MergeDisjointPaths {
    fn resolve(&self, incoming: &Patch, committed_since: &[Patch], _current: &Value) -> ConflictOutcome {
        let mut touched_by_others: HashSet<String> = HashSet::new();
        for patch in committed_since {
            touched_by_others.extend(touched_paths(patch));
        }
        let incoming_paths: HashSet<String> = touched_paths(incoming).into_iter().collect();

        if incoming_paths.is_disjoint(&touched_by_others) {
            ConflictOutcome::Accept
        } else {
            ConflictOutcome::Reject
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn patch_for(path_old: Value, path_new: Value) -> Patch {
        json_patch::diff(&path_old, &path_new)
    }

    #[test]
    fn first_write_wins_rejects_after_any_commit() {
        let resolver = FirstWriteWins;
        let incoming = patch_for(json!({"a": 1}), json!({"a": 2}));
        let committed = vec![patch_for(json!({"b": 1}), json!({"b": 2}))];
        assert!(matches!(
            resolver.resolve(&incoming, &committed, &json!({})),
            ConflictOutcome::Reject
        ));
    }

    #[test]
    fn first_write_wins_accepts_when_nothing_committed() {
        let resolver = FirstWriteWins;
        let incoming = patch_for(json!({"a": 1}), json!({"a": 2}));
        assert!(matches!(
            resolver.resolve(&incoming, &[], &json!({})),
            ConflictOutcome::Accept
        ));
    }

    #[test]
    fn merge_accepts_disjoint_paths() {
        let resolver = MergeDisjointPaths;
        let incoming = patch_for(json!({"a": 1}), json!({"a": 2}));
        let committed = vec![patch_for(json!({"b": 1}), json!({"b": 2}))];
        assert!(matches!(
            resolver.resolve(&incoming, &committed, &json!({})),
            ConflictOutcome::Accept
        ));
    }

    #[test]
    fn merge_rejects_overlapping_paths() {
        let resolver = MergeDisjointPaths;
        let incoming = patch_for(json!({"a": 1}), json!({"a": 2}));
        let committed = vec![patch_for(json!({"a": 1}), json!({"a": 99}))];
        assert!(matches!(
            resolver.resolve(&incoming, &committed, &json!({})),
            ConflictOutcome::Reject
        ));
    }
}
