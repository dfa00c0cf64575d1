//! Telemetry
//!
//! Tracing subscriber setup: human-readable output while developing, JSON
//! lines in production.

mod tracing_setup;

pub use tracing_setup::{try_init_tracing_with_config, TracingConfig, TracingError};
