//! Secret reader: the decrypted key-value map behind one secret path.

use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, info};

use super::client::{KvTransport, VaultRequest};
use super::credentials::VaultCredentials;
use super::mounts::{KvVersion, Mount};
use super::versions::KvVersionCache;
use crate::errors::VaultError;
use crate::observability::MetricsRecorder;

/// API path of the read endpoint for `relative_path` within `mount`.
pub fn read_api_path(mount: &Mount, relative_path: &str) -> String {
    if mount.is_kv2() {
        format!("{}data/{}", mount.path, relative_path)
    } else {
        format!("{}{}", mount.path, relative_path)
    }
}

/// Read one secret, unwrapping the KV v2 envelope when needed.
///
/// A 404 on a mount believed to be v2 is retried once against the v1
/// endpoint; if that succeeds the mount is downgraded in `versions`.
pub async fn read_secret(
    transport: &dyn KvTransport,
    credentials: &VaultCredentials,
    versions: &KvVersionCache,
    mount: &Mount,
    relative_path: &str,
    timeout: Duration,
) -> Result<Map<String, Value>, VaultError> {
    let mount = versions.resolve(mount);

    if mount.is_kv2() {
        let request = VaultRequest::read("read", read_api_path(&mount, relative_path), timeout);
        match transport.get(credentials, request).await {
            Ok(body) => return Ok(unwrap_v2(body)),
            Err(e) if e.is_not_found() => {
                debug!(mount = %mount.path, path = %relative_path, "v2 read returned 404, retrying as v1");
            }
            Err(e) => return Err(e),
        }

        let v1 = mount.with_version(KvVersion::V1);
        let request = VaultRequest::read("read", read_api_path(&v1, relative_path), timeout);
        let body = transport.get(credentials, request).await?;
        if versions.downgrade_to_v1(&mount.path) {
            MetricsRecorder::new().record_version_flip();
            info!(mount = %mount.path, "Mount answers KV v1 reads, downgraded from v2");
        }
        return Ok(unwrap_v1(body));
    }

    let request = VaultRequest::read("read", read_api_path(&mount, relative_path), timeout);
    let body = transport.get(credentials, request).await?;
    Ok(unwrap_v1(body))
}

fn unwrap_v2(mut body: Value) -> Map<String, Value> {
    into_object(body.get_mut("data").and_then(|data| data.get_mut("data")).map(Value::take))
}

fn unwrap_v1(mut body: Value) -> Map<String, Value> {
    into_object(body.get_mut("data").map(Value::take))
}

fn into_object(value: Option<Value>) -> Map<String, Value> {
    match value {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    }
}
