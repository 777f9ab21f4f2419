// ABOUTME: Circuit breaker: fails fast once a dependency is tripping, probes recovery in half-open
// ABOUTME: All state is atomic; no mutex is needed for the hot allow/record path
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::future::Future;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Instant;

use tracing::{info, warn};

use crate::config::ResilienceConfig;
use crate::error::StreamError;

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation — requests pass through, failures are counted.
    Closed,
    /// Tripped — requests fail immediately until `reset_timeout` elapses.
    Open,
    /// Testing recovery — admits up to `half_open_max_calls` probe requests.
    HalfOpen,
}

impl CircuitState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Closed,
            1 => Self::Open,
            _ => Self::HalfOpen,
        }
    }

    const fn to_u8(self) -> u8 {
        match self {
            Self::Closed => 0,
            Self::Open => 1,
            Self::HalfOpen => 2,
        }
    }
}

/// Thread-safe circuit breaker guarding a single dependency. All counters are
/// atomics so `is_allowed`/`record_success`/`record_failure` never block.
pub struct CircuitBreaker {
    name: String,
    state: AtomicU32,
    consecutive_failures: AtomicU32,
    half_open_successes: AtomicU32,
    half_open_in_flight: AtomicU32,
    opened_at_ms: AtomicU64,
    config: ResilienceConfig,
    start: Instant,
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, ResilienceConfig::default())
    }

    #[must_use]
    pub fn with_config(name: impl Into<String>, config: ResilienceConfig) -> Self {
        Self {
            name: name.into(),
            state: AtomicU32::new(CircuitState::Closed.to_u8().into()),
            consecutive_failures: AtomicU32::new(0),
            half_open_successes: AtomicU32::new(0),
            half_open_in_flight: AtomicU32::new(0),
            opened_at_ms: AtomicU64::new(0),
            config,
            start: Instant::now(),
        }
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn state(&self) -> CircuitState {
        CircuitState::from_u8(self.state.load(Ordering::SeqCst) as u8)
    }

    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::SeqCst)
    }

    /// True if a call may proceed right now. In `HalfOpen`, admits up to
    /// `half_open_max_calls` concurrent probes rather than just one.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        match self.state() {
            CircuitState::Closed => true,
            CircuitState::Open => self.try_transition_to_half_open(),
            CircuitState::HalfOpen => {
                self.half_open_in_flight.load(Ordering::SeqCst) < self.config.half_open_max_calls
            }
        }
    }

    fn try_transition_to_half_open(&self) -> bool {
        let opened_at = self.opened_at_ms.load(Ordering::SeqCst);
        let elapsed = self.elapsed_ms();
        #[allow(clippy::cast_possible_truncation)]
        let reset_ms = self.config.reset_timeout.as_millis() as u64;

        if elapsed.saturating_sub(opened_at) >= reset_ms {
            let expected = CircuitState::Open.to_u8().into();
            let next = CircuitState::HalfOpen.to_u8().into();
            if self
                .state
                .compare_exchange(expected, next, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                info!(breaker = %self.name, "transitioning to half-open for recovery probe");
                return true;
            }
        }
        false
    }

    #[allow(clippy::cast_possible_truncation)]
    fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    pub fn record_success(&self) {
        match self.state() {
            CircuitState::Closed => {
                self.consecutive_failures.store(0, Ordering::SeqCst);
            }
            CircuitState::HalfOpen => {
                self.half_open_in_flight.fetch_sub(1, Ordering::SeqCst);
                let successes = self.half_open_successes.fetch_add(1, Ordering::SeqCst) + 1;
                if successes >= self.config.success_threshold {
                    self.state
                        .store(CircuitState::Closed.to_u8().into(), Ordering::SeqCst);
                    self.consecutive_failures.store(0, Ordering::SeqCst);
                    self.half_open_successes.store(0, Ordering::SeqCst);
                    info!(breaker = %self.name, "closed — dependency recovered");
                }
            }
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(&self) {
        match self.state() {
            CircuitState::Closed => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
                if failures >= self.config.max_failures {
                    self.open();
                    warn!(
                        breaker = %self.name,
                        failures,
                        threshold = self.config.max_failures,
                        "opened — consecutive failure threshold reached"
                    );
                }
            }
            CircuitState::HalfOpen => {
                self.half_open_in_flight.fetch_sub(1, Ordering::SeqCst);
                self.half_open_successes.store(0, Ordering::SeqCst);
                self.open();
                warn!(breaker = %self.name, "re-opened — recovery probe failed");
            }
            CircuitState::Open => {
                self.opened_at_ms.store(self.elapsed_ms(), Ordering::SeqCst);
            }
        }
    }

    fn open(&self) {
        self.state
            .store(CircuitState::Open.to_u8().into(), Ordering::SeqCst);
        self.opened_at_ms.store(self.elapsed_ms(), Ordering::SeqCst);
    }

    /// Executes `operation` with circuit breaker protection. Entering
    /// half-open increments the in-flight probe count for the duration of
    /// the call.
    pub async fn call<F, T, E>(&self, operation: F) -> Result<T, StreamError>
    where
        F: Future<Output = Result<T, E>>,
    {
        if !self.is_allowed() {
            return Err(StreamError::CircuitOpen(self.name.clone()));
        }
        if self.state() == CircuitState::HalfOpen {
            self.half_open_in_flight.fetch_add(1, Ordering::SeqCst);
        }

        match operation.await {
            Ok(result) => {
                self.record_success();
                Ok(result)
            }
            Err(_) => {
                self.record_failure();
                Err(StreamError::Internal(format!(
                    "operation guarded by circuit '{}' failed",
                    self.name
                )))
            }
        }
    }

    pub fn reset(&self) {
        self.state
            .store(CircuitState::Closed.to_u8().into(), Ordering::SeqCst);
        self.consecutive_failures.store(0, Ordering::SeqCst);
        self.half_open_successes.store(0, Ordering::SeqCst);
        self.half_open_in_flight.store(0, Ordering::SeqCst);
        info!(breaker = %self.name, "manually reset to closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config() -> ResilienceConfig {
        ResilienceConfig {
            max_failures: 2,
            reset_timeout: Duration::from_millis(20),
            half_open_max_calls: 1,
            success_threshold: 1,
            ..ResilienceConfig::default()
        }
    }

    #[test]
    fn opens_after_consecutive_failure_threshold() {
        let breaker = CircuitBreaker::with_config("svc", config());
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.is_allowed());
    }

    #[test]
    fn success_resets_consecutive_failures_while_closed() {
        let breaker = CircuitBreaker::with_config("svc", config());
        breaker.record_failure();
        breaker.record_success();
        assert_eq!(breaker.consecutive_failures(), 0);
    }

    #[tokio::test]
    async fn transitions_to_half_open_after_reset_timeout_then_closes_on_success() {
        let breaker = CircuitBreaker::with_config("svc", config());
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(breaker.is_allowed());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn manual_reset_returns_to_closed() {
        let breaker = CircuitBreaker::with_config("svc", config());
        breaker.record_failure();
        breaker.record_failure();
        breaker.reset();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }
}
