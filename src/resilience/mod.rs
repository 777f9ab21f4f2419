// ABOUTME: Resilience primitives — component G of the streaming SDK
// ABOUTME: Circuit breaker and retry-with-backoff, composable around any fallible async call
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

mod circuit_breaker;
mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use retry::{backoff_delay, retry};
