// ABOUTME: Counter/gauge/histogram primitives used by components that need a discrete metric
// ABOUTME: Atomic-backed, no external exporter — grounded on the teacher's atomic CircuitBreaker counters
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Mutex;

/// Monotonically increasing counter, e.g. "frames parsed", "deltas dropped".
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    pub fn incr(&self) -> u64 {
        self.value.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn add(&self, n: u64) -> u64 {
        self.value.fetch_add(n, Ordering::Relaxed) + n
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Point-in-time value that can go up or down, e.g. "active watchers".
#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicI64,
}

impl Gauge {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            value: AtomicI64::new(0),
        }
    }

    pub fn set(&self, v: i64) {
        self.value.store(v, Ordering::Relaxed);
    }

    pub fn incr(&self) -> i64 {
        self.value.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn decr(&self) -> i64 {
        self.value.fetch_sub(1, Ordering::Relaxed) - 1
    }

    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Simple sample histogram, e.g. for request duration. Kept coarse on purpose:
/// this is an in-process observability primitive, not a metrics-exporter client.
#[derive(Debug, Default)]
pub struct Histogram {
    samples: Mutex<Vec<f64>>,
}

impl Histogram {
    #[must_use]
    pub fn new() -> Self {
        Self {
            samples: Mutex::new(Vec::new()),
        }
    }

    pub fn record(&self, value: f64) {
        if let Ok(mut samples) = self.samples.lock() {
            samples.push(value);
        }
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.samples.lock().map(|s| s.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn mean(&self) -> Option<f64> {
        let samples = self.samples.lock().ok()?;
        if samples.is_empty() {
            return None;
        }
        Some(samples.iter().sum::<f64>() / samples.len() as f64)
    }

    #[must_use]
    pub fn percentile(&self, p: f64) -> Option<f64> {
        let mut samples = self.samples.lock().ok()?.clone();
        if samples.is_empty() {
            return None;
        }
        samples.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let idx = ((samples.len() as f64 - 1.0) * p.clamp(0.0, 1.0)).round() as usize;
        samples.get(idx).copied()
    }
}
