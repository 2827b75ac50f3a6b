//! Path lister: immediate children of a mount prefix.

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use super::client::{KvTransport, VaultRequest};
use super::credentials::VaultCredentials;
use super::mounts::Mount;
use crate::errors::VaultError;

/// Outcome of listing one prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListOutcome {
    /// Child keys; a trailing `/` marks a sub-collection
    Keys(Vec<String>),
    /// The mount was listed as KV v2 and answered 404; retry as v1
    VersionMismatch,
}

/// API path of the list endpoint for `prefix` within `mount`.
pub fn list_api_path(mount: &Mount, prefix: &str) -> String {
    if mount.is_kv2() {
        format!("{}metadata/{}", mount.path, prefix)
    } else {
        format!("{}{}", mount.path, prefix)
    }
}

/// List the children of `prefix` (relative to the mount, `""` for the root).
///
/// - 404 on a v2 mount: [`ListOutcome::VersionMismatch`]
/// - 404 on a v1 mount: no keys (Vault's answer for an empty prefix)
/// - 403: no keys, nothing visible here
/// - anything else: propagated for the caller to log and skip
pub async fn list_children(
    transport: &dyn KvTransport,
    credentials: &VaultCredentials,
    mount: &Mount,
    prefix: &str,
    timeout: Duration,
) -> Result<ListOutcome, VaultError> {
    let api_path = list_api_path(mount, prefix);
    let request = VaultRequest::list(api_path.clone(), timeout);
    match transport.get(credentials, request).await {
        Ok(body) => parse_keys(&body, &api_path).map(ListOutcome::Keys),
        Err(e) if e.is_not_found() && mount.is_kv2() => Ok(ListOutcome::VersionMismatch),
        Err(e) if e.is_not_found() => Ok(ListOutcome::Keys(Vec::new())),
        Err(e) if e.is_forbidden() => {
            debug!(mount = %mount.path, prefix = %prefix, "List forbidden, skipping prefix");
            Ok(ListOutcome::Keys(Vec::new()))
        }
        Err(e) => Err(e),
    }
}

fn parse_keys(body: &Value, api_path: &str) -> Result<Vec<String>, VaultError> {
    let keys = body.pointer("/data/keys").and_then(Value::as_array).ok_or_else(|| {
        VaultError::Decode { path: api_path.to_string(), message: "missing data.keys".into() }
    })?;
    Ok(keys.iter().filter_map(Value::as_str).map(str::to_string).collect())
}
