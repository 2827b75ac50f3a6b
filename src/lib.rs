//! # vaultsearch
//!
//! Concurrent search across HashiCorp Vault KV mounts (v1 and v2). A search
//! finds secrets whose path, keys or values match a term, streaming results
//! as they are found.
//!
//! ## Architecture
//!
//! ```text
//! SearchEngine.start ─► Mount catalog ─► Path lister (N workers) ─► path matches
//!                                                                     │
//!      TaskRegistry ◄── deep results ◄── Tree traverser ◄── Secret reader (N workers)
//! ```
//!
//! ## Core Components
//!
//! - **vault**: Vault HTTP access (mount catalog, KV listing and reads, KV
//!   version correction)
//! - **search**: matcher, JSON traverser, two-phase orchestrator, task registry
//!   and the [`SearchEngine`] facade
//! - **cli**: the `vaultsearch` command
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use vaultsearch::{EngineConfig, Result, SearchEngine, SearchQuery, VaultCredentials};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let engine = SearchEngine::new(EngineConfig::from_env()?)?;
//!     let credentials = VaultCredentials::from_env()?;
//!     let id = engine.start(&credentials, SearchQuery::new("db-password"))?;
//!     if let Some(snapshot) = engine.status(id.as_str()).await {
//!         println!("{} path hits so far", snapshot.path_hits.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod observability;
pub mod search;
pub mod vault;

// Re-export commonly used types
pub use config::{EngineConfig, ObservabilityConfig};
pub use errors::{Error, Result, VaultError};
pub use observability::init_tracing;
pub use search::{
    MatchMode, SearchEngine, SearchEvent, SearchQuery, SearchResult, TaskId, TaskSnapshot,
    TaskStatus,
};
pub use vault::VaultCredentials;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
