// ABOUTME: Fixed-size async worker pool with a bounded task queue (component I)
// ABOUTME: Cooperative cancellation via context; shutdown drains up to a grace period then aborts
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{StreamError, StreamResult};

type BoxedJob = Pin<Box<dyn Future<Output = Result<Value, String>> + Send>>;

struct Job {
    task_id: String,
    future: BoxedJob,
}

/// Result of one completed task, per the executor's public status/results
/// queries.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub task_id: String,
    pub success: bool,
    pub duration: Duration,
    pub worker_id: usize,
    pub result: Option<Value>,
    pub error: Option<String>,
}

/// Per-worker throughput counters exposed by `worker_stats`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkerStats {
    pub worker_id: usize,
    pub tasks_completed: u64,
}

/// A fixed-size pool of workers draining a bounded task queue.
pub struct Pool {
    tx: mpsc::Sender<Job>,
    records: Arc<DashMap<String, TaskRecord>>,
    worker_counts: Arc<Vec<AtomicU64>>,
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl Pool {
    #[must_use]
    pub fn new(worker_count: usize, queue_capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let records = Arc::new(DashMap::new());
        let worker_counts: Arc<Vec<AtomicU64>> =
            Arc::new((0..worker_count.max(1)).map(|_| AtomicU64::new(0)).collect());
        let cancel = CancellationToken::new();
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let handles = (0..worker_count.max(1))
            .map(|worker_id| {
                let rx = rx.clone();
                let records = records.clone();
                let worker_counts = worker_counts.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    worker_loop(worker_id, rx, records, worker_counts, cancel).await;
                })
            })
            .collect();

        Self {
            tx,
            records,
            worker_counts,
            cancel,
            handles,
        }
    }

    /// Submits a task for background execution. Rejects with `QueueFull`
    /// once the bounded channel has no capacity, rather than blocking the
    /// submitter.
    pub fn submit<F>(&self, task_id: impl Into<String>, job: F) -> StreamResult<()>
    where
        F: Future<Output = Result<Value, String>> + Send + 'static,
    {
        let job = Job {
            task_id: task_id.into(),
            future: Box::pin(job),
        };
        self.tx.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => StreamError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => StreamError::Cancelled,
        })
    }

    #[must_use]
    pub fn status(&self, task_id: &str) -> Option<TaskRecord> {
        self.records.get(task_id).map(|r| r.clone())
    }

    #[must_use]
    pub fn results(&self) -> Vec<TaskRecord> {
        self.records.iter().map(|r| r.value().clone()).collect()
    }

    #[must_use]
    pub fn worker_stats(&self) -> Vec<WorkerStats> {
        self.worker_counts
            .iter()
            .enumerate()
            .map(|(worker_id, count)| WorkerStats {
                worker_id,
                tasks_completed: count.load(Ordering::Relaxed),
            })
            .collect()
    }

    /// Signals cancellation and stops accepting new work, then waits up to
    /// `grace` for in-flight tasks to finish before aborting the rest.
    pub async fn shutdown(self, grace: Duration) {
        drop(self.tx);
        let abort_handles: Vec<_> = self.handles.iter().map(JoinHandle::abort_handle).collect();
        match tokio::time::timeout(grace, futures_util::future::join_all(self.handles)).await {
            Ok(_) => info!("worker pool drained cleanly"),
            Err(_) => {
                warn!("grace period elapsed, aborting remaining workers");
                self.cancel.cancel();
                for handle in abort_handles {
                    handle.abort();
                }
            }
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<Job>>>,
    records: Arc<DashMap<String, TaskRecord>>,
    worker_counts: Arc<Vec<AtomicU64>>,
    cancel: CancellationToken,
) {
    loop {
        let job = {
            let mut guard = rx.lock().await;
            tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                job = guard.recv() => job,
            }
        };
        let Some(job) = job else { break };

        let start = Instant::now();
        let outcome = job.future.await;
        let duration = start.elapsed();
        let record = match outcome {
            Ok(result) => TaskRecord {
                task_id: job.task_id.clone(),
                success: true,
                duration,
                worker_id,
                result: Some(result),
                error: None,
            },
            Err(error) => TaskRecord {
                task_id: job.task_id.clone(),
                success: false,
                duration,
                worker_id,
                result: None,
                error: Some(error),
            },
        };
        records.insert(job.task_id, record);
        if let Some(counter) = worker_counts.get(worker_id) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }
}
