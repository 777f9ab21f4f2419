// ABOUTME: Versioned shared-state engine — component E of the streaming SDK
// ABOUTME: Ties together RFC 6902 patching, history-based catch-up, conflict resolution and fan-out
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

mod conflict;
mod history;
mod patch;
mod store;
mod watcher;

pub use conflict::{ConflictOutcome, ConflictResolver, FirstWriteWins, LastWriteWins, MergeDisjointPaths};
pub use patch::{is_forbidden_path, touched_paths};
pub use store::StateStore;
pub use watcher::{Delta, Watcher};
