// ABOUTME: Structured logging setup for observability and debugging
// ABOUTME: Configures log levels and output format; grounded on the teacher's tracing-subscriber wiring
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::env;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format for the structured logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

/// Logging configuration, read from the environment with sane defaults.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub service_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: env::var("AGENTFLOW_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("AGENTFLOW_LOG_FORMAT").as_deref() {
                Ok("json") => LogFormat::Json,
                Ok("compact") => LogFormat::Compact,
                _ => LogFormat::Pretty,
            },
            service_name: env::var("AGENTFLOW_SERVICE_NAME")
                .unwrap_or_else(|_| "agentflow-stream".to_string()),
        }
    }
}

/// Initialize the global `tracing` subscriber. Safe to call once at process start;
/// subsequent calls are no-ops if a subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_format_is_pretty_without_env() {
        let cfg = LoggingConfig {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            service_name: "test".to_string(),
        };
        assert_eq!(cfg.format, LogFormat::Pretty);
    }
}
