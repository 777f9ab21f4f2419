// ABOUTME: Versioned document store with snapshot/delta semantics and watcher fan-out (component E)
// ABOUTME: Every commit is atomic: diff, validate by re-applying, then bump version and broadcast
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use json_patch::Patch;
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::config::StateConfig;
use crate::error::{StreamError, StreamResult};

use super::conflict::{ConflictOutcome, ConflictResolver, LastWriteWins};
use super::history::History;
use super::patch;
use super::watcher::{self, Delta, TrySendError, Watcher, WatcherHandle};

struct Inner {
    state: Value,
    version: u64,
    closed: bool,
}

/// A versioned JSON document with atomic updates and watcher fan-out.
///
/// `Clone` is cheap: all instances share the same underlying document via
/// `Arc`, mirroring the store's role as a single shared point of truth for a
/// session.
#[derive(Clone)]
pub struct StateStore {
    inner: Arc<Mutex<Inner>>,
    watchers: Arc<DashMap<Uuid, WatcherHandle>>,
    history: Arc<Mutex<History>>,
    resolver: Arc<dyn ConflictResolver>,
    watcher_capacity: usize,
}

impl StateStore {
    #[must_use]
    pub fn new(initial: Value, config: &StateConfig) -> Self {
        Self::with_resolver(initial, config, Arc::new(LastWriteWins))
    }

    #[must_use]
    pub fn with_resolver(
        initial: Value,
        config: &StateConfig,
        resolver: Arc<dyn ConflictResolver>,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: initial,
                version: 0,
                closed: false,
            })),
            watchers: Arc::new(DashMap::new()),
            history: Arc::new(Mutex::new(History::new(config.max_history))),
            resolver,
            watcher_capacity: config.watcher_capacity,
        }
    }

    /// Returns a deep, self-consistent copy of the current state. Never
    /// aliases the store's internal memory.
    #[must_use]
    pub fn snapshot(&self) -> (u64, Value) {
        let guard = self.lock_inner();
        (guard.version, guard.state.clone())
    }

    /// Locks the inner state, recovering from poisoning rather than panicking —
    /// a panicked `update` closure must not take the whole store down with it.
    fn lock_inner(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn lock_history(&self) -> std::sync::MutexGuard<'_, History> {
        self.history.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Atomically applies `f` to a clone of the current state, validates the
    /// resulting patch by re-applying it and comparing byte-for-byte, then
    /// commits and broadcasts. A no-op mutation (empty patch) bumps neither
    /// version nor watchers.
    pub fn update<F>(&self, f: F) -> StreamResult<u64>
    where
        F: FnOnce(&Value) -> Value,
    {
        let mut guard = self.lock_inner();
        if guard.closed {
            return Err(StreamError::WatcherClosed);
        }
        let old = guard.state.clone();
        let new = f(&old);
        let computed = patch::diff(&old, &new);
        if computed.0.is_empty() {
            return Ok(guard.version);
        }
        patch::validate(&old, &computed, &new)?;

        guard.state = new;
        guard.version += 1;
        let version = guard.version;
        drop(guard);

        self.lock_history().push(version, computed.clone());
        self.broadcast(Delta::Patch {
            version,
            patch: computed,
        });
        Ok(version)
    }

    /// Applies an externally-submitted patch that was computed against
    /// `expected_version`. If the store has advanced since then, the
    /// configured `ConflictResolver` decides whether to accept it anyway.
    pub fn apply_external_patch(
        &self,
        expected_version: u64,
        incoming: Patch,
    ) -> StreamResult<u64> {
        for op_path in patch::touched_paths(&incoming) {
            if patch::is_forbidden_path(&op_path) {
                return Err(StreamError::ForbiddenPath(op_path));
            }
        }

        let mut guard = self.lock_inner();
        if guard.closed {
            return Err(StreamError::WatcherClosed);
        }

        if guard.version != expected_version {
            let committed_since = self
                .lock_history()
                .since(expected_version)
                .unwrap_or_default()
                .into_iter()
                .map(|(_, p)| p)
                .collect::<Vec<_>>();
            match self
                .resolver
                .resolve(&incoming, &committed_since, &guard.state)
            {
                ConflictOutcome::Reject => return Err(StreamError::PatchMismatch(
                    "incoming patch conflicts with commits since its expected version".to_string(),
                )),
                ConflictOutcome::Accept => {}
            }
        }

        let old = guard.state.clone();
        let new = patch::apply(&old, &incoming)?;
        guard.state = new;
        guard.version += 1;
        let version = guard.version;
        drop(guard);

        self.lock_history().push(version, incoming.clone());
        self.broadcast(Delta::Patch {
            version,
            patch: incoming,
        });
        Ok(version)
    }

    /// Subscribes to future deltas. A bounded channel (sized per config) is
    /// created and registered; the caller is responsible for calling
    /// `Watcher::close` (or dropping it and calling `gc`) when done.
    pub fn watch(&self) -> Watcher {
        let (handle_watcher, handle) = watcher::channel(self.watcher_capacity);
        self.watchers.insert(handle_watcher.id, handle);
        handle_watcher
    }

    /// Delivers catch-up deltas since `since_version`, or a fresh snapshot if
    /// the history no longer covers the gap.
    #[must_use]
    pub fn catch_up(&self, since_version: u64) -> Delta {
        if let Some(deltas) = self.lock_history().since(since_version) {
            if let Some((version, patch)) = deltas.into_iter().last() {
                return Delta::Patch { version, patch };
            }
        }
        let (version, state) = self.snapshot();
        Delta::Snapshot { version, state }
    }

    /// Removes watchers whose context has been cancelled. Call periodically
    /// or from a supervising task driven by each watcher's own context.
    pub fn gc_closed_watchers(&self) {
        self.watchers.retain(|_, handle| !handle.cancel.is_cancelled());
    }

    /// Closes and drops all watchers; subsequent mutations fail.
    pub fn close(&self) {
        let mut guard = self.lock_inner();
        guard.closed = true;
        drop(guard);
        for entry in self.watchers.iter() {
            entry.value().cancel.cancel();
        }
        self.watchers.clear();
    }

    fn broadcast(&self, delta: Delta) {
        for entry in self.watchers.iter() {
            if let Err(TrySendError::Full) = entry.value().try_send(delta.clone()) {
                warn!(event = "channel full", watcher_id = %entry.key(), "dropping delta for slow watcher");
            }
        }
    }
}
