//! Mount catalog: which KV mounts a search walks.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::client::{KvTransport, VaultRequest};
use super::credentials::VaultCredentials;

/// Mount assumed when the catalog cannot be read.
pub const FALLBACK_MOUNT: &str = "secret/";

/// KV secrets engine protocol variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KvVersion {
    V1,
    V2,
}

/// A KV mount, e.g. `secret/` speaking KV v2.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mount {
    /// Always ends with `/`
    pub path: String,
    pub version: KvVersion,
}

impl Mount {
    pub fn new(path: impl AsRef<str>, version: KvVersion) -> Self {
        Self { path: normalize_mount_path(path.as_ref()), version }
    }

    pub fn is_kv2(&self) -> bool {
        self.version == KvVersion::V2
    }

    /// Mount path without the trailing slash, as the Vault UI expects it.
    pub fn name(&self) -> &str {
        self.path.trim_end_matches('/')
    }

    pub fn with_version(&self, version: KvVersion) -> Self {
        Self { path: self.path.clone(), version }
    }
}

/// Result of mount discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountDiscovery {
    pub mounts: Vec<Mount>,
    /// Set when the catalog was unreachable and the fallback mount was used
    pub warning: Option<String>,
}

/// Resolve searchable KV mounts from `sys/mounts`.
///
/// A failed catalog call degrades to a single [`FALLBACK_MOUNT`] (KV v2) and
/// reports a warning instead of failing the search.
pub async fn discover_mounts(
    transport: &dyn KvTransport,
    credentials: &VaultCredentials,
    timeout: Duration,
) -> MountDiscovery {
    let request = VaultRequest::read("mounts", "sys/mounts", timeout);
    match transport.get(credentials, request).await {
        Ok(body) => {
            let mounts = parse_mounts(&body);
            debug!(mount_count = mounts.len(), "Discovered KV mounts");
            MountDiscovery { mounts, warning: None }
        }
        Err(e) => {
            warn!(error = %e, fallback = FALLBACK_MOUNT, "Mount catalog unavailable, using fallback mount");
            MountDiscovery {
                mounts: vec![Mount::new(FALLBACK_MOUNT, KvVersion::V2)],
                warning: Some(format!(
                    "mount catalog unavailable ({}); searching fallback mount {}",
                    e, FALLBACK_MOUNT
                )),
            }
        }
    }
}

/// Extract KV mounts from a `sys/mounts` body.
///
/// Vault returns the table both under `data` and at the top level; entries
/// are read from both and de-duplicated by path. `generic` is the legacy name
/// of the KV v1 engine.
pub fn parse_mounts(body: &Value) -> Vec<Mount> {
    let tables = [body.get("data"), Some(body)];
    let mut seen = HashSet::new();
    let mut mounts = Vec::new();

    for table in tables.into_iter().flatten().filter_map(Value::as_object) {
        for (path, entry) in table {
            let engine = entry.get("type").and_then(Value::as_str);
            if !matches!(engine, Some("kv") | Some("generic")) {
                continue;
            }
            let version = match entry.pointer("/options/version").and_then(Value::as_str) {
                Some("2") => KvVersion::V2,
                _ => KvVersion::V1,
            };
            let mount = Mount::new(path, version);
            if seen.insert(mount.path.clone()) {
                mounts.push(mount);
            }
        }
    }

    mounts
}

fn normalize_mount_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    format!("{}/", trimmed)
}
