// ABOUTME: Configuration surface for every tunable in the streaming stack
// ABOUTME: Each component owns a config struct with documented defaults, overridable via env vars
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::env;
use std::time::Duration;

fn env_duration_ms(key: &str, default: Duration) -> Duration {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Component A (parser) configuration.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Internal read buffer size hint.
    pub buffer_size: usize,
    /// Maximum line length before the stream fails with an oversize-line error.
    pub max_line_len: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            buffer_size: env_usize("AGENTFLOW_PARSER_BUFFER_SIZE", 8 * 1024),
            max_line_len: env_usize("AGENTFLOW_PARSER_MAX_LINE_LEN", 1024 * 1024),
        }
    }
}

/// Component C (reconnecting client) configuration.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    pub enabled: bool,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub jitter_factor: f64,
    /// 0 = unlimited.
    pub max_retries: u32,
    pub max_elapsed_time: Option<Duration>,
    pub reset_interval: Duration,
    pub idle_timeout: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_delay: env_duration_ms("AGENTFLOW_RECONNECT_INITIAL_DELAY_MS", Duration::from_millis(250)),
            max_delay: env_duration_ms("AGENTFLOW_RECONNECT_MAX_DELAY_MS", Duration::from_secs(30)),
            backoff_multiplier: env_f64("AGENTFLOW_RECONNECT_BACKOFF_MULTIPLIER", 2.0),
            jitter_factor: env_f64("AGENTFLOW_RECONNECT_JITTER_FACTOR", 0.2),
            max_retries: 0,
            max_elapsed_time: None,
            reset_interval: env_duration_ms("AGENTFLOW_RECONNECT_RESET_INTERVAL_MS", Duration::from_secs(60)),
            idle_timeout: env_duration_ms("AGENTFLOW_RECONNECT_IDLE_TIMEOUT_MS", Duration::from_secs(5 * 60)),
        }
    }
}

/// Output mode for the incremental renderer (component D).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Pretty,
    Json,
    Quiet,
}

/// Component D (renderer) configuration.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    pub output_mode: OutputMode,
    pub no_color: bool,
    pub max_buffer_size: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            output_mode: OutputMode::Pretty,
            no_color: env::var("NO_COLOR").is_ok(),
            max_buffer_size: env_usize("AGENTFLOW_RENDERER_MAX_BUFFER_SIZE", 1024 * 1024),
        }
    }
}

/// Component E (state store) configuration.
#[derive(Debug, Clone)]
pub struct StateConfig {
    /// Number of recent deltas retained for watcher catch-up; 0 disables history.
    pub max_history: usize,
    /// Interval at which a full snapshot is force-broadcast; `None` disables it.
    pub snapshot_interval: Option<Duration>,
    /// Bounded channel capacity handed to each new watcher.
    pub watcher_capacity: usize,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            max_history: env_usize("AGENTFLOW_STATE_MAX_HISTORY", 256),
            snapshot_interval: None,
            watcher_capacity: env_usize("AGENTFLOW_STATE_WATCHER_CAPACITY", 100),
        }
    }
}

/// Rate limiting algorithm selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitAlgorithm {
    TokenBucket,
    SlidingWindow,
    FixedWindow,
}

/// Key derivation strategy for a rate limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyGenerator {
    Ip,
    User,
    Endpoint,
    Composite,
}

/// Component G/rate-limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub algorithm: RateLimitAlgorithm,
    pub requests_per_unit: u64,
    pub unit: Duration,
    pub burst: u64,
    pub key_generator: KeyGenerator,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            algorithm: RateLimitAlgorithm::TokenBucket,
            requests_per_unit: 10,
            unit: Duration::from_secs(1),
            burst: 10,
            key_generator: KeyGenerator::Ip,
        }
    }
}

/// Component G (circuit breaker + retry) configuration.
#[derive(Debug, Clone)]
pub struct ResilienceConfig {
    pub max_failures: u32,
    pub reset_timeout: Duration,
    pub half_open_max_calls: u32,
    pub success_threshold: u32,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub retry_max_delay: Duration,
    pub backoff_factor: f64,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            max_failures: 5,
            reset_timeout: Duration::from_secs(30),
            half_open_max_calls: 1,
            success_threshold: 2,
            timeout: Duration::from_secs(10),
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            retry_max_delay: Duration::from_secs(5),
            backoff_factor: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconnect_defaults_match_spec() {
        let cfg = ReconnectConfig::default();
        assert_eq!(cfg.initial_delay, Duration::from_millis(250));
        assert_eq!(cfg.max_delay, Duration::from_secs(30));
        assert!((cfg.backoff_multiplier - 2.0).abs() < f64::EPSILON);
        assert!((cfg.jitter_factor - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn state_defaults_are_sane() {
        let cfg = StateConfig::default();
        assert_eq!(cfg.watcher_capacity, 100);
    }
}
