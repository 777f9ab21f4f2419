// ABOUTME: Rate limiting algorithms and key derivation — component F of the streaming SDK
// ABOUTME: All limiters expose the same Allow/Reset/Info contract regardless of algorithm
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

mod fixed_window;
mod key;
mod sliding_window;
mod token_bucket;

use std::time::Duration;

use chrono::{DateTime, Utc};

pub use fixed_window::FixedWindowLimiter;
pub use key::derive_key;
pub use sliding_window::SlidingWindowLimiter;
pub use token_bucket::TokenBucketLimiter;

/// Outcome of an `allow` check, uniform across every algorithm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub allowed: bool,
    pub remaining: u64,
    pub reset_at: DateTime<Utc>,
    pub retry_after: Option<Duration>,
}

/// Common contract every rate-limiting algorithm implements. Keys are
/// opaque strings produced by [`derive_key`]; buckets are created lazily on
/// first use per key.
pub trait RateLimiter: Send + Sync {
    fn allow(&self, key: &str) -> Decision;
    fn reset(&self, key: &str);
    fn info(&self, key: &str) -> Decision;
}
