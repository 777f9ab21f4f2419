// ABOUTME: Observability primitives — structured logging setup and counter/gauge/histogram metrics
// ABOUTME: Component K from the design: no external metrics exporter, just typed in-process primitives

pub mod log_entry;
pub mod logging;
pub mod metrics;

pub use log_entry::LogEntry;
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use metrics::{Counter, Gauge, Histogram};
