// ABOUTME: Fixed window rate limiter: counter resets exactly at aligned windowSize boundaries
// ABOUTME: retryAfter is the time remaining until the next boundary
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::Utc;
use dashmap::DashMap;

use crate::config::RateLimitConfig;

use super::{Decision, RateLimiter};

struct Window {
    count: u64,
    index: u64,
}

/// `{count, windowStart}` per the data model, with `windowStart` derived as
/// `epoch + index * windowSize` rather than stored directly — every key
/// shares the same sequence of aligned boundaries (offsets from the
/// limiter's creation instant) instead of each key floating its own window
/// from whenever its first request happened. Traffic right at a boundary can
/// still burst up to `2x limit` across the seam — the documented
/// fixed-window tradeoff versus the sliding-window algorithm — but the
/// boundary itself never drifts.
pub struct FixedWindowLimiter {
    windows: DashMap<String, Mutex<Window>>,
    limit: u64,
    window_size: Duration,
    epoch: Instant,
}

impl FixedWindowLimiter {
    #[must_use]
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            windows: DashMap::new(),
            limit: config.requests_per_unit.max(1),
            window_size: config.unit,
            epoch: Instant::now(),
        }
    }

    /// The index of the aligned window containing `now`.
    fn index_at(&self, now: Instant) -> u64 {
        let window_nanos = self.window_size.as_nanos().max(1);
        let elapsed_nanos = now.saturating_duration_since(self.epoch).as_nanos();
        (elapsed_nanos / window_nanos) as u64
    }

    /// Time remaining until `index`'s window ends.
    fn boundary_remaining(&self, now: Instant, index: u64) -> Duration {
        let window_nanos = self.window_size.as_nanos().max(1);
        let next_boundary_nanos = window_nanos.saturating_mul(u128::from(index) + 1);
        let elapsed_nanos = now.saturating_duration_since(self.epoch).as_nanos();
        if next_boundary_nanos > elapsed_nanos {
            Duration::from_nanos((next_boundary_nanos - elapsed_nanos).min(u128::from(u64::MAX)) as u64)
        } else {
            Duration::ZERO
        }
    }

    fn roll_if_expired(&self, window: &mut Window, now: Instant) {
        let current_index = self.index_at(now);
        if window.index != current_index {
            window.index = current_index;
            window.count = 0;
        }
    }
}

impl RateLimiter for FixedWindowLimiter {
    fn allow(&self, key: &str) -> Decision {
        let entry = self.windows.entry(key.to_string()).or_insert_with(|| {
            Mutex::new(Window {
                count: 0,
                index: self.index_at(Instant::now()),
            })
        });
        let mut window = entry.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let now = Instant::now();
        self.roll_if_expired(&mut window, now);

        let boundary_remaining = self.boundary_remaining(now, window.index);

        if window.count < self.limit {
            window.count += 1;
            Decision {
                allowed: true,
                remaining: self.limit - window.count,
                reset_at: Utc::now() + chrono::Duration::from_std(boundary_remaining).unwrap_or_default(),
                retry_after: None,
            }
        } else {
            Decision {
                allowed: false,
                remaining: 0,
                reset_at: Utc::now() + chrono::Duration::from_std(boundary_remaining).unwrap_or_default(),
                retry_after: Some(boundary_remaining),
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
                remaining: self.limit,
                reset_at: Utc::now(),
                retry_after: None,
            };
        };
        let mut window = entry.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        self.roll_if_expired(&mut window, Instant::now());
        Decision {
            allowed: window.count < self.limit,
            remaining: self.limit.saturating_sub(window.count),
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
            unit: StdDuration::from_millis(50),
            ..RateLimitConfig::default()
        }
    }

    #[test]
    fn rejects_once_count_reaches_limit() {
        let limiter = FixedWindowLimiter::new(&config());
        assert!(limiter.allow("k").allowed);
        assert!(limiter.allow("k").allowed);
        let third = limiter.allow("k");
        assert!(!third.allowed);
    }

    #[test]
    fn resets_on_demand() {
        let limiter = FixedWindowLimiter::new(&config());
        limiter.allow("k");
        limiter.allow("k");
        limiter.reset("k");
        assert!(limiter.allow("k").allowed);
    }

    #[test]
    fn different_keys_share_the_same_window_boundary() {
        let limiter = FixedWindowLimiter::new(&config());
        let first_index = limiter.index_at(Instant::now());
        std::thread::sleep(StdDuration::from_millis(20));
        limiter.allow("a");
        limiter.allow("b");
        let index_a = limiter.windows.get("a").unwrap().lock().unwrap().index;
        let index_b = limiter.windows.get("b").unwrap().lock().unwrap().index;
        assert_eq!(index_a, index_b);
        assert_eq!(index_a, first_index);
    }

    #[test]
    fn window_rolls_over_at_the_aligned_boundary_not_on_arrival() {
        let limiter = FixedWindowLimiter::new(&config());
        limiter.allow("k");
        let index_before = limiter.windows.get("k").unwrap().lock().unwrap().index;
        std::thread::sleep(StdDuration::from_millis(60));
        limiter.allow("k");
        let index_after = limiter.windows.get("k").unwrap().lock().unwrap().index;
        assert!(index_after > index_before);
    }
}
