// ABOUTME: Async middleware chain executing stages on a worker pool with bounded queue and per-request timeout
// ABOUTME: Requests beyond capacity are rejected with a queue-full error; batches preserve input order
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, Semaphore};

use crate::error::{StreamError, StreamResult};

use super::chain::Chain;
use super::request::{Request, Response};

/// Wraps a [`Chain`] so requests run under a bounded concurrency limit and a
/// per-request timeout, matching the async chain's queue-full/timeout
/// semantics without needing its own dedicated worker threads — the chain
/// itself runs on whatever task calls `process`; the semaphore is the queue.
pub struct AsyncChain {
    chain: Arc<Chain>,
    queue: Arc<Semaphore>,
    per_request_timeout: Duration,
}

impl AsyncChain {
    #[must_use]
    pub fn new(chain: Chain, capacity: usize, per_request_timeout: Duration) -> Self {
        Self {
            chain: Arc::new(chain),
            queue: Arc::new(Semaphore::new(capacity.max(1))),
            per_request_timeout,
        }
    }

    /// Processes one request. Returns `QueueFull` immediately if the
    /// concurrency limit is already saturated, or a retryable transport
    /// error if the chain does not finish within the configured timeout.
    pub async fn process(&self, mut req: Request) -> StreamResult<Response> {
        let Ok(permit) = self.queue.clone().try_acquire_owned() else {
            return Err(StreamError::QueueFull);
        };

        let chain = self.chain.clone();
        let result = tokio::time::timeout(self.per_request_timeout, async move {
            let _permit = permit;
            chain.process(&mut req).await
        })
        .await;

        result.map_err(|_| StreamError::TransportRetryable {
            message: "async chain request timed out".to_string(),
            retry_after: None,
        })
    }

    /// Runs a batch concurrently, one task per request, and returns results
    /// in the same order as `requests` regardless of completion order.
    pub async fn process_batch(&self, requests: Vec<Request>) -> Vec<StreamResult<Response>> {
        let mut receivers = Vec::with_capacity(requests.len());
        for req in requests {
            let (tx, rx) = oneshot::channel();
            let chain = self.chain.clone();
            let queue = self.queue.clone();
            let timeout = self.per_request_timeout;
            tokio::spawn(async move {
                let outcome = match queue.try_acquire_owned() {
                    Err(_) => Err(StreamError::QueueFull),
                    Ok(permit) => {
                        let mut req = req;
                        let run = async move {
                            let _permit = permit;
                            chain.process(&mut req).await
                        };
                        tokio::time::timeout(timeout, run).await.map_err(|_| {
                            StreamError::TransportRetryable {
                                message: "async chain request timed out".to_string(),
                                retry_after: None,
                            }
                        })
                    }
                };
                let _ = tx.send(outcome);
            });
            receivers.push(rx);
        }

        let mut results = Vec::with_capacity(receivers.len());
        for rx in receivers {
            results.push(rx.await.unwrap_or(Err(StreamError::Cancelled)));
        }
        results
    }
}
