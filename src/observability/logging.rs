//! # Structured Logging
//!
//! Subscriber setup and span helpers built on the tracing ecosystem.
//!
//! Secret values never reach the logs: workers log paths, counters and error
//! kinds only.

use crate::config::ObservabilityConfig;
use crate::errors::{Error, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// Create a tracing span for one search operation.
///
/// ```rust,ignore
/// let span = search_span!("phase_a", task_id);
/// let span = search_span!("phase_b", task_id, candidates = 12);
/// ```
#[macro_export]
macro_rules! search_span {
    ($operation:expr, $task_id:expr) => {
        tracing::info_span!(
            "search_operation",
            operation = %$operation,
            task_id = %$task_id
        )
    };
    ($operation:expr, $task_id:expr, $($field:tt)*) => {
        tracing::info_span!(
            "search_operation",
            operation = %$operation,
            task_id = %$task_id,
            $($field)*
        )
    };
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Installing twice
/// (e.g. from tests) is reported as a configuration error. Logs go to stderr
/// so they never interleave with search output on stdout.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    let filter = build_filter(std::env::var("RUST_LOG").ok().as_deref(), &config.log_level)?;

    let result = if config.json_logging {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .try_init()
    } else {
        fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).try_init()
    };

    result.map_err(|e| Error::config(format!("Failed to install tracing subscriber: {}", e)))
}

/// `rust_log` wins when it parses; otherwise `log_level` must.
fn build_filter(rust_log: Option<&str>, log_level: &str) -> Result<EnvFilter> {
    if let Some(filter) = rust_log.and_then(|directives| EnvFilter::try_new(directives).ok()) {
        return Ok(filter);
    }
    EnvFilter::try_new(log_level)
        .map_err(|e| Error::config(format!("Invalid log filter '{}': {}", log_level, e)))
}
