// ABOUTME: Token bucket rate limiter: refills at a fixed rate up to a capacity, 1 token per request
// ABOUTME: On empty, retryAfter = 1/rate per the bucket's own refill rate
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::Utc;
use dashmap::DashMap;

use crate::config::RateLimitConfig;

use super::{Decision, RateLimiter};

struct Bucket {
    tokens: f64,
    last_fill: Instant,
}

/// `{tokens, capacity, refillRate, lastFill}` per the data model, keyed
/// lazily per caller.
pub struct TokenBucketLimiter {
    buckets: DashMap<String, Mutex<Bucket>>,
    capacity: f64,
    rate_per_sec: f64,
}

impl TokenBucketLimiter {
    #[must_use]
    pub fn new(config: &RateLimitConfig) -> Self {
        let rate_per_sec = config.requests_per_unit as f64 / config.unit.as_secs_f64().max(f64::MIN_POSITIVE);
        Self {
            buckets: DashMap::new(),
            capacity: config.burst.max(1) as f64,
            rate_per_sec,
        }
    }

    fn refill(&self, bucket: &mut Bucket, now: Instant) {
        let elapsed = now.saturating_duration_since(bucket.last_fill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rate_per_sec).min(self.capacity);
        bucket.last_fill = now;
    }
}

impl RateLimiter for TokenBucketLimiter {
    fn allow(&self, key: &str) -> Decision {
        let entry = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| {
                Mutex::new(Bucket {
                    tokens: self.capacity,
                    last_fill: Instant::now(),
                })
            });
        let mut bucket = entry.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let now = Instant::now();
        self.refill(&mut bucket, now);

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Decision {
                allowed: true,
                remaining: bucket.tokens.floor() as u64,
                reset_at: Utc::now(),
                retry_after: None,
            }
        } else {
            let retry_after = Duration::from_secs_f64(1.0 / self.rate_per_sec.max(f64::MIN_POSITIVE));
            Decision {
                allowed: false,
                remaining: 0,
                reset_at: Utc::now() + chrono::Duration::from_std(retry_after).unwrap_or_default(),
                retry_after: Some(retry_after),
            }
        }
    }

    fn reset(&self, key: &str) {
        self.buckets.remove(key);
    }

    fn info(&self, key: &str) -> Decision {
        let Some(entry) = self.buckets.get(key) else {
            return Decision {
                allowed: true,
                remaining: self.capacity as u64,
                reset_at: Utc::now(),
                retry_after: None,
            };
        };
        let mut bucket = entry.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        self.refill(&mut bucket, Instant::now());
        Decision {
            allowed: bucket.tokens >= 1.0,
            remaining: bucket.tokens.floor() as u64,
            reset_at: Utc::now(),
            retry_after: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    fn config() -> RateLimitConfig {
        RateLimitConfig {
            requests_per_unit: 10,
            unit: StdDuration::from_secs(1),
            burst: 2,
            ..RateLimitConfig::default()
        }
    }

    #[test]
    fn consumes_one_token_per_request_until_empty() {
        let limiter = TokenBucketLimiter::new(&config());
        assert!(limiter.allow("k").allowed);
        assert!(limiter.allow("k").allowed);
        let third = limiter.allow("k");
        assert!(!third.allowed);
        assert!(third.retry_after.is_some());
    }

    #[test]
    fn reset_clears_the_bucket() {
        let limiter = TokenBucketLimiter::new(&config());
        limiter.allow("k");
        limiter.allow("k");
        limiter.reset("k");
        assert!(limiter.allow("k").allowed);
    }
}
