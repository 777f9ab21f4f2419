// ABOUTME: Structured log record for discrete observability events (channel full, circuit opened)
// ABOUTME: Distinct from free-form tracing calls — used where the event itself is a first-class value
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A single structured observability event, emitted via `tracing` and also
/// retained in-process where a caller wants to inspect recent events (tests,
/// admin endpoints).
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub event: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogEntry {
    #[must_use]
    pub fn new(level: LogLevel, event: impl Into<String>, message: impl Into<String>) -> Self {
        let entry = Self {
            timestamp: Utc::now(),
            level,
            event: event.into(),
            message: message.into(),
        };
        entry.emit();
        entry
    }

    fn emit(&self) {
        match self.level {
            LogLevel::Debug => tracing::debug!(event = %self.event, "{}", self.message),
            LogLevel::Info => tracing::info!(event = %self.event, "{}", self.message),
            LogLevel::Warn => tracing::warn!(event = %self.event, "{}", self.message),
            LogLevel::Error => tracing::error!(event = %self.event, "{}", self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_carries_event_name() {
        let entry = LogEntry::new(LogLevel::Warn, "channel_full", "dropped delta for watcher w1");
        assert_eq!(entry.event, "channel_full");
    }
}
