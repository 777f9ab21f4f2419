// ABOUTME: Sliding window rate limiter: allowed iff fewer than `limit` requests fall within windowSize
// ABOUTME: retryAfter is computed from the oldest timestamp still inside the window
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::Utc;
use dashmap::DashMap;

use crate::config::RateLimitConfig;

use super::{Decision, RateLimiter};

/// An ordered sequence of request timestamps within `windowSize`, keyed
/// lazily per caller.
pub struct SlidingWindowLimiter {
    windows: DashMap<String, Mutex<VecDeque<Instant>>>,
    limit: usize,
    window_size: Duration,
}

impl SlidingWindowLimiter {
    #[must_use]
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            windows: DashMap::new(),
            limit: config.requests_per_unit.max(1) as usize,
            window_size: config.unit,
        }
    }

    fn evict_stale(&self, entries: &mut VecDeque<Instant>, now: Instant) {
        while let Some(&front) = entries.front() {
            if now.saturating_duration_since(front) > self.window_size {
                entries.pop_front();
            } else {
                break;
            }
        }
    }
}

impl RateLimiter for SlidingWindowLimiter {
    fn allow(&self, key: &str) -> Decision {
        let entry = self.windows.entry(key.to_string()).or_default();
        let mut entries = entry.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let now = Instant::now();
        self.evict_stale(&mut entries, now);

        if entries.len() < self.limit {
            entries.push_back(now);
            Decision {
                allowed: true,
                remaining: (self.limit - entries.len()) as u64,
                reset_at: Utc::now() + chrono::Duration::from_std(self.window_size).unwrap_or_default(),
                retry_after: None,
            }
        } else {
            let retry_after = entries
                .front()
                .map(|&oldest| self.window_size.saturating_sub(now.saturating_duration_since(oldest)))
                .unwrap_or(self.window_size);
            Decision {
                allowed: false,
                remaining: 0,
                reset_at: Utc::now() + chrono::Duration::from_std(retry_after).unwrap_or_default(),
                retry_after: Some(retry_after),
            }
        }
    }

    fn reset(&self, key: &str) {
        self.windows.remove(key);
    }

    fn info(&self, key: &str) -> Decision {
        let Some(entry) = self.windows.get(key) else {
            return Decision {
                allowed: true,
                remaining: self.limit as u64,
                reset_at: Utc::now(),
                retry_after: None,
            };
        };
        let mut entries = entry.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        self.evict_stale(&mut entries, Instant::now());
        Decision {
            allowed: entries.len() < self.limit,
            remaining: self.limit.saturating_sub(entries.len()) as u64,
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
            requests_per_unit: 2,
            unit: StdDuration::from_millis(200),
            ..RateLimitConfig::default()
        }
    }

    #[test]
    fn rejects_once_window_is_full() {
        let limiter = SlidingWindowLimiter::new(&config());
        assert!(limiter.allow("k").allowed);
        assert!(limiter.allow("k").allowed);
        let third = limiter.allow("k");
        assert!(!third.allowed);
        assert!(third.retry_after.is_some());
    }
}
