// ABOUTME: Bounded ring buffer of recent (version, patch) pairs for watcher catch-up
// ABOUTME: Sized by StateConfig::max_history; oldest entries evict first
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::collections::VecDeque;

use json_patch::Patch;

/// Retains the last `capacity` committed deltas so a watcher that detects a
/// gap (e.g. after a dropped send) can request everything since a known
/// version instead of falling back to a full snapshot.
pub struct History {
    entries: VecDeque<(u64, Patch)>,
    capacity: usize,
}

impl History {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    pub fn push(&mut self, version: u64, patch: Patch) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back((version, patch));
    }

    /// Returns the deltas committed strictly after `since_version`, or `None`
    /// if the history no longer covers that version (caller must fall back to
    /// a full snapshot).
    #[must_use]
    pub fn since(&self, since_version: u64) -> Option<Vec<(u64, Patch)>> {
        if let Some((oldest_version, _)) = self.entries.front() {
            if since_version + 1 < *oldest_version {
                return None;
            }
        } else if since_version > 0 {
            return None;
        }
        Some(
            self.entries
                .iter()
                .filter(|(v, _)| *v > since_version)
                .cloned()
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn patch() -> Patch {
        json_patch::diff(&json!({"a": 1}), &json!({"a": 2}))
    }

    #[test]
    fn evicts_oldest_when_over_capacity() {
        let mut history = History::new(2);
        history.push(1, patch());
        history.push(2, patch());
        history.push(3, patch());
        let since = history.since(0);
        assert!(since.is_none(), "version 1 was evicted, caller must snapshot");
    }

    #[test]
    fn returns_deltas_after_given_version() {
        let mut history = History::new(10);
        history.push(1, patch());
        history.push(2, patch());
        history.push(3, patch());
        let since = history.since(1).unwrap();
        assert_eq!(since.len(), 2);
        assert_eq!(since[0].0, 2);
    }
}
