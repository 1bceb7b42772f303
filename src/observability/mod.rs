//! Observability for token-janitor
//!
//! - `tracing` subscriber writing to stderr, text or JSON
//! - Per-run counters

mod logger;
mod metrics;

pub use logger::{init_logging, level_filter, LogFormat, DEFAULT_LEVEL};
pub use metrics::{MetricsSnapshot, RunMetrics};
