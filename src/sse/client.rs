// ABOUTME: Reconnecting SSE client — survives transport faults with backoff and resumption
// ABOUTME: Component C: wraps an abstract connector, classifies errors, tracks Last-Event-ID
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::frame::Frame;
use crate::config::ReconnectConfig;
use crate::error::StreamError;

/// An abstract transport the reconnecting client drives. Implementations open
/// a connection resuming from `last_event_id` and stream frames back over the
/// returned channel until the connection ends or fails.
///
/// Kept as a trait (rather than hard-wiring a specific HTTP client) so the
/// reconnect/backoff logic is testable without real sockets, the same way the
/// teacher's `CacheProvider` trait makes the cache layer swappable.
#[async_trait]
pub trait SseConnector: Send + Sync {
    async fn connect(
        &self,
        last_event_id: Option<String>,
    ) -> Result<mpsc::Receiver<Result<Frame, StreamError>>, StreamError>;
}

/// Computes the backoff delay for attempt `n` (1-indexed), with jitter applied.
#[must_use]
pub fn backoff_delay(config: &ReconnectConfig, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1);
    let base_ms = config.initial_delay.as_millis() as f64 * config.backoff_multiplier.powi(exponent as i32);
    let capped_ms = base_ms.min(config.max_delay.as_millis() as f64);

    let jitter = if config.jitter_factor > 0.0 {
        rand::thread_rng().gen_range(-config.jitter_factor..=config.jitter_factor)
    } else {
        0.0
    };
    let jittered_ms = (capped_ms * (1.0 + jitter)).max(0.0);
    Duration::from_millis(jittered_ms as u64)
}

/// Classifies a raw HTTP status code observed during connect/stream as
/// retryable or terminal, per the design's error classification table.
#[must_use]
pub fn classify_status(status: u16) -> bool {
    matches!(status, 408 | 425 | 429 | 500..=504)
}

/// Maintains continuity of an SSE stream across faults. Single worker per
/// stream; frames are forwarded to `output` in arrival order.
pub struct ReconnectingClient<C: SseConnector> {
    connector: C,
    config: ReconnectConfig,
    last_event_id: Mutex<Option<String>>,
    attempt: AtomicU32,
}

impl<C: SseConnector + 'static> ReconnectingClient<C> {
    #[must_use]
    pub fn new(connector: C, config: ReconnectConfig) -> Self {
        Self {
            connector,
            config,
            last_event_id: Mutex::new(None),
            attempt: AtomicU32::new(0),
        }
    }

    #[must_use]
    pub fn last_event_id(&self) -> Option<String> {
        self.last_event_id.lock().ok().and_then(|g| g.clone())
    }

    fn record_frame_id(&self, frame: &Frame) {
        if let Some(id) = &frame.id {
            if let Ok(mut guard) = self.last_event_id.lock() {
                *guard = Some(id.clone());
            }
        }
    }

    /// Run the reconnect loop until `cancel` fires or a terminal error occurs,
    /// forwarding frames to `output`. Returns the terminal error, if any.
    pub async fn run(
        &self,
        output: mpsc::Sender<Frame>,
        cancel: CancellationToken,
    ) -> Option<StreamError> {
        loop {
            if cancel.is_cancelled() {
                return None;
            }

            let last_id = self.last_event_id();
            let connect_result = tokio::select! {
                () = cancel.cancelled() => return None,
                result = self.connector.connect(last_id) => result,
            };

            let mut rx = match connect_result {
                Ok(rx) => rx,
                Err(err) => {
                    if is_terminal(&err) {
                        return Some(err);
                    }
                    if self.exhausted_retries() {
                        return Some(err);
                    }
                    self.sleep_backoff(&err, &cancel).await;
                    continue;
                }
            };

            let connected_at = Instant::now();
            let mut received_any = false;

            loop {
                let idle = tokio::time::sleep(self.config.idle_timeout);
                tokio::pin!(idle);

                tokio::select! {
                    () = cancel.cancelled() => return None,
                    () = &mut idle => {
                        tracing::warn!("idle timeout waiting for SSE frame, reconnecting");
                        break;
                    }
                    maybe_frame = rx.recv() => {
                        match maybe_frame {
                            Some(Ok(frame)) => {
                                received_any = true;
                                self.record_frame_id(&frame);
                                if connected_at.elapsed() >= self.config.reset_interval {
                                    self.attempt.store(0, Ordering::SeqCst);
                                }
                                if output.send(frame).await.is_err() {
                                    return None;
                                }
                            }
                            Some(Err(err)) => {
                                if is_terminal(&err) {
                                    return Some(err);
                                }
                                break;
                            }
                            None => break,
                        }
                    }
                }
            }

            if received_any && connected_at.elapsed() >= self.config.reset_interval {
                self.attempt.store(0, Ordering::SeqCst);
            }

            if self.exhausted_retries() {
                return Some(StreamError::retryable("reconnect attempts exhausted"));
            }
            self.sleep_backoff(&StreamError::retryable("stream ended"), &cancel).await;
        }
    }

    fn exhausted_retries(&self) -> bool {
        self.config.max_retries != 0 && self.attempt.load(Ordering::SeqCst) >= self.config.max_retries
    }

    async fn sleep_backoff(&self, err: &StreamError, cancel: &CancellationToken) {
        let attempt = self.attempt.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = match err {
            StreamError::TransportRetryable {
                retry_after: Some(d),
                ..
            } => *d,
            _ => backoff_delay(&self.config, attempt),
        };
        tokio::select! {
            () = cancel.cancelled() => {}
            () = tokio::time::sleep(delay) => {}
        }
    }
}

fn is_terminal(err: &StreamError) -> bool {
    matches!(err, StreamError::TransportTerminal { .. } | StreamError::Cancelled)
}

/// A pure function variant of the retry-with-backoff loop, usable outside the
/// full client for one-off resilient calls (mirrors `resilience::retry`, kept
/// separate because it also understands the `Retry-After` override).
pub async fn with_backoff<T, E, F>(
    config: &ReconnectConfig,
    mut attempt_fn: impl FnMut() -> Pin<Box<dyn Future<Output = Result<T, E>> + Send>>,
    classify: F,
) -> Result<T, E>
where
    F: Fn(&E) -> bool,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match attempt_fn().await {
            Ok(v) => return Ok(v),
            Err(err) => {
                if !classify(&err) || (config.max_retries != 0 && attempt >= config.max_retries) {
                    return Err(err);
                }
                tokio::time::sleep(backoff_delay(config, attempt)).await;
            }
        }
    }
}
