//! # Configuration Settings
//!
//! Defines the engine and observability configuration structures.

use crate::errors::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

/// Engine-wide settings shared by every search the engine runs.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EngineConfig {
    /// Timeout for list and mount catalog calls in seconds
    #[validate(range(min = 1, max = 120, message = "List timeout must be between 1 and 120 seconds"))]
    pub list_timeout_seconds: u64,

    /// Timeout for secret reads in seconds
    #[validate(range(min = 1, max = 120, message = "Read timeout must be between 1 and 120 seconds"))]
    pub read_timeout_seconds: u64,

    /// How long a finished task stays pollable
    #[validate(range(min = 1, message = "Task retention must be at least 1 second"))]
    pub task_retention_seconds: u64,

    /// Period of the registry sweeper
    #[validate(range(min = 1, max = 3600, message = "Sweep interval must be between 1 and 3600 seconds"))]
    pub sweep_interval_seconds: u64,

    /// Dice similarity required for a fuzzy match
    #[validate(range(min = 0.0, max = 1.0, message = "Fuzzy threshold must be between 0 and 1"))]
    pub fuzzy_threshold: f64,

    /// Capacity of each task's event channel
    #[validate(range(min = 16, message = "Event buffer must hold at least 16 events"))]
    pub event_buffer: usize,

    /// Match values longer than this are truncated for display
    #[validate(range(min = 8, message = "Value display limit must be at least 8 characters"))]
    pub max_value_chars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            list_timeout_seconds: 8,
            read_timeout_seconds: 10,
            task_retention_seconds: 300,
            sweep_interval_seconds: 30,
            fuzzy_threshold: 0.8,
            event_buffer: 1024,
            max_value_chars: 256,
        }
    }
}

impl EngineConfig {
    /// Load from `VAULTSEARCH_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            list_timeout_seconds: super::env_or(
                "VAULTSEARCH_LIST_TIMEOUT_SECS",
                defaults.list_timeout_seconds,
            )?,
            read_timeout_seconds: super::env_or(
                "VAULTSEARCH_READ_TIMEOUT_SECS",
                defaults.read_timeout_seconds,
            )?,
            task_retention_seconds: super::env_or(
                "VAULTSEARCH_TASK_RETENTION_SECS",
                defaults.task_retention_seconds,
            )?,
            sweep_interval_seconds: super::env_or(
                "VAULTSEARCH_SWEEP_INTERVAL_SECS",
                defaults.sweep_interval_seconds,
            )?,
            fuzzy_threshold: super::env_or("VAULTSEARCH_FUZZY_THRESHOLD", defaults.fuzzy_threshold)?,
            event_buffer: super::env_or("VAULTSEARCH_EVENT_BUFFER", defaults.event_buffer)?,
            max_value_chars: super::env_or(
                "VAULTSEARCH_MAX_VALUE_CHARS",
                defaults.max_value_chars,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn list_timeout(&self) -> Duration {
        Duration::from_secs(self.list_timeout_seconds)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_seconds)
    }

    pub fn task_retention(&self) -> Duration {
        Duration::from_secs(self.task_retention_seconds)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ObservabilityConfig {
    /// Log level or full `EnvFilter` directive (e.g. `info,vaultsearch=debug`)
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string(), json_logging: false }
    }
}

impl ObservabilityConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            log_level: std::env::var("VAULTSEARCH_LOG_LEVEL").unwrap_or(defaults.log_level),
            json_logging: super::env_or("VAULTSEARCH_LOG_JSON", defaults.json_logging)?,
        };
        config.validate()?;
        Ok(config)
    }
}
