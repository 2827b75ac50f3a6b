//! # Vault KV access
//!
//! Read-only access to the parts of the Vault HTTP API the search needs:
//!
//! - `GET /v1/sys/mounts` for the mount catalog ([`mounts`])
//! - `LIST /v1/{mount}metadata/{path}` (v2) or `/v1/{mount}{path}` (v1) ([`lister`])
//! - `GET /v1/{mount}data/{path}` (v2) or `/v1/{mount}{path}` (v1) ([`reader`])
//!
//! KV v1 and v2 differ in endpoint layout and response envelope. The catalog
//! reports each mount's version, and [`versions::KvVersionCache`] corrects it
//! when a mount turns out to answer the other protocol.

pub mod client;
pub mod credentials;
pub mod lister;
pub mod mounts;
pub mod reader;
pub mod versions;

#[cfg(test)]
pub(crate) mod test_utils;

pub use client::{KvTransport, VaultClient, VaultRequest};
pub use credentials::VaultCredentials;
pub use lister::{list_children, ListOutcome};
pub use mounts::{discover_mounts, KvVersion, Mount, MountDiscovery, FALLBACK_MOUNT};
pub use reader::read_secret;
pub use versions::KvVersionCache;
