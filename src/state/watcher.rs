// ABOUTME: A subscription yielding state deltas until closed, bound to a cancellation context
// ABOUTME: Holds a bounded channel and a close latch; never blocks the producer store
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use json_patch::Patch;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// A single commit delivered to a watcher: either an incremental patch or a
/// forced full snapshot (used for periodic re-sync and catch-up after a gap).
#[derive(Debug, Clone)]
pub enum Delta {
    Patch { version: u64, patch: Patch },
    Snapshot { version: u64, state: Value },
}

/// Consumer-facing handle. Holds only a receiver and the context used to tear
/// it down — it never owns the store, matching the "weak back-reference
/// only" ownership rule.
pub struct Watcher {
    pub id: Uuid,
    rx: mpsc::Receiver<Delta>,
    cancel: CancellationToken,
}

impl Watcher {
    #[must_use]
    pub(super) fn new(id: Uuid, rx: mpsc::Receiver<Delta>, cancel: CancellationToken) -> Self {
        Self { id, rx, cancel }
    }

    /// Receive the next delta, or `None` once the watcher is closed and drained.
    pub async fn recv(&mut self) -> Option<Delta> {
        self.rx.recv().await
    }

    pub fn close(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Store-side handle: the sending half plus the same close latch, kept in the
/// store's watcher table.
pub(super) struct WatcherHandle {
    pub tx: mpsc::Sender<Delta>,
    pub cancel: CancellationToken,
}

impl WatcherHandle {
    /// Non-blocking send. A full channel drops the delta for this watcher
    /// only; the producer never awaits the consumer.
    pub fn try_send(&self, delta: Delta) -> Result<(), TrySendError> {
        if self.cancel.is_cancelled() {
            return Err(TrySendError::Closed);
        }
        self.tx.try_send(delta).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TrySendError::Full,
            mpsc::error::TrySendError::Closed(_) => TrySendError::Closed,
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum TrySendError {
    Full,
    Closed,
}

/// Creates a new watcher pair: the consumer-facing `Watcher` and the
/// store-side `WatcherHandle` to register internally.
pub(super) fn channel(capacity: usize) -> (Watcher, WatcherHandle) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let cancel = CancellationToken::new();
    let id = Uuid::new_v4();
    (
        Watcher::new(id, rx, cancel.clone()),
        WatcherHandle { tx, cancel },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn closed_watcher_rejects_sends() {
        let (watcher, handle) = channel(4);
        watcher.close();
        let result = handle.try_send(Delta::Snapshot {
            version: 1,
            state: json!({}),
        });
        assert_eq!(result, Err(TrySendError::Closed));
    }

    #[tokio::test]
    async fn full_channel_drops_without_blocking() {
        let (mut watcher, handle) = channel(1);
        handle
            .try_send(Delta::Snapshot {
                version: 1,
                state: json!({}),
            })
            .unwrap();
        let second = handle.try_send(Delta::Snapshot {
            version: 2,
            state: json!({}),
        });
        assert_eq!(second, Err(TrySendError::Full));

        let first = watcher.recv().await.unwrap();
        match first {
            Delta::Snapshot { version, .. } => assert_eq!(version, 1),
            Delta::Patch { .. } => panic!("expected snapshot"),
        }
    }
}
