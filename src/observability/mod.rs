//! # Observability Infrastructure
//!
//! Structured logging and metrics for the search engine.

pub mod logging;
pub mod metrics;

pub use logging::init_tracing;
pub use metrics::MetricsRecorder;
