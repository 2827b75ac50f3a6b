//! # Configuration Management
//!
//! Engine and logging configuration, read from environment variables.
//! Vault credentials live in [`crate::vault::VaultCredentials`] since they
//! are passed per call rather than held by the engine.

pub mod settings;

pub use settings::{EngineConfig, ObservabilityConfig};

use crate::errors::{Error, Result};
use std::str::FromStr;

/// Read `name` from the environment, parsing it as `T`.
///
/// Unset or empty variables yield `default`; unparsable values are an error.
pub(crate) fn env_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| Error::config(format!("Invalid value for {}: {}", name, e))),
        _ => Ok(default),
    }
}
