// ABOUTME: Generic retry-with-backoff combinator driven by a caller-supplied retryable predicate
// ABOUTME: Circuit-open errors are never retried; delay = min(initialDelay * backoffFactor^(n-1), maxDelay)
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::config::ResilienceConfig;

/// Delay before attempt `n` (1-indexed), per the backoff formula. `n == 1`
/// has no preceding delay; callers should not call this before the first
/// attempt.
#[must_use]
pub fn backoff_delay(config: &ResilienceConfig, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1);
    let scaled = config.initial_delay.as_secs_f64() * config.backoff_factor.powi(exponent as i32);
    Duration::from_secs_f64(scaled).min(config.retry_max_delay)
}

/// Retries `operation` until it succeeds, `is_retryable` returns false for
/// the error, or `max_attempts` is exhausted. The first attempt always runs
/// immediately; subsequent attempts wait `backoff_delay`.
pub async fn retry<F, Fut, T, E>(
    config: &ResilienceConfig,
    mut is_retryable: impl FnMut(&E) -> bool,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= config.max_attempts || !is_retryable(&err) {
                    return Err(err);
                }
                let delay = backoff_delay(config, attempt);
                warn!(attempt, delay_ms = delay.as_millis() as u64, "retrying after failure");
                tokio::time::sleep(delay).await;
            }
        }
    }
}
