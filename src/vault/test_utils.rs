//! In-memory Vault for unit tests.
//!
//! Answers the same API paths as a real Vault (`sys/mounts`, KV v1 and KV v2
//! list/read endpoints), including the 404-on-empty-list behaviour, and
//! records every call so tests can assert on request sequences.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::client::{KvTransport, VaultRequest};
use super::credentials::VaultCredentials;
use super::mounts::KvVersion;
use crate::errors::VaultError;

struct MountState {
    actual: KvVersion,
    declared: KvVersion,
    secrets: BTreeMap<String, Value>,
}

#[derive(Default)]
pub(crate) struct InMemoryVault {
    mounts: Mutex<BTreeMap<String, MountState>>,
    failures: Mutex<HashMap<String, VaultError>>,
    calls: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl InMemoryVault {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_mount(self, path: &str, version: KvVersion) -> Self {
        self.with_mount_declared(path, version, version)
    }

    /// Mount that really speaks `actual` but is advertised as `declared`.
    pub(crate) fn with_mount_declared(
        self,
        path: &str,
        actual: KvVersion,
        declared: KvVersion,
    ) -> Self {
        self.mounts
            .lock()
            .unwrap()
            .insert(path.to_string(), MountState { actual, declared, secrets: BTreeMap::new() });
        self
    }

    pub(crate) fn with_secret(self, mount: &str, path: &str, value: Value) -> Self {
        self.put_secret(mount, path, value);
        self
    }

    /// Write a secret after the vault is already shared with an engine.
    pub(crate) fn put_secret(&self, mount: &str, path: &str, value: Value) {
        self.mounts
            .lock()
            .unwrap()
            .get_mut(mount)
            .expect("mount registered before secrets")
            .secrets
            .insert(path.to_string(), value);
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make every request for `api_path` fail with `error`.
    pub(crate) fn fail(&self, api_path: &str, error: VaultError) {
        self.failures.lock().unwrap().insert(api_path.to_string(), error);
    }

    /// Requests seen so far, as `LIST <path>` or `GET <path>`.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn mounts_body(&self) -> Value {
        let mounts = self.mounts.lock().unwrap();
        let table: serde_json::Map<String, Value> = mounts
            .iter()
            .map(|(path, state)| {
                let version = match state.declared {
                    KvVersion::V1 => "1",
                    KvVersion::V2 => "2",
                };
                (path.clone(), json!({ "type": "kv", "options": { "version": version } }))
            })
            .collect();
        json!({ "data": table })
    }

    fn answer(&self, request: &VaultRequest) -> Result<Value, VaultError> {
        let not_found = || VaultError::NotFound { path: request.api_path.clone() };
        if request.api_path == "sys/mounts" {
            return Ok(self.mounts_body());
        }

        let mounts = self.mounts.lock().unwrap();
        let (mount_path, state) = mounts
            .iter()
            .find(|(path, _)| request.api_path.starts_with(path.as_str()))
            .ok_or_else(not_found)?;
        let rest = &request.api_path[mount_path.len()..];

        let target = match state.actual {
            KvVersion::V2 if request.list => rest.strip_prefix("metadata/"),
            KvVersion::V2 => rest.strip_prefix("data/"),
            KvVersion::V1 => Some(rest),
        }
        .ok_or_else(not_found)?;

        if request.list {
            let keys: BTreeSet<String> = state
                .secrets
                .keys()
                .filter_map(|path| path.strip_prefix(target))
                .filter(|remainder| !remainder.is_empty())
                .map(|remainder| match remainder.find('/') {
                    Some(idx) => remainder[..=idx].to_string(),
                    None => remainder.to_string(),
                })
                .collect();
            if keys.is_empty() {
                return Err(not_found());
            }
            return Ok(json!({ "data": { "keys": keys } }));
        }

        let value = state.secrets.get(target).ok_or_else(not_found)?;
        Ok(match state.actual {
            KvVersion::V2 => json!({ "data": { "data": value, "metadata": { "version": 1 } } }),
            KvVersion::V1 => json!({ "data": value }),
        })
    }
}

#[async_trait]
impl KvTransport for InMemoryVault {
    async fn get(
        &self,
        _credentials: &VaultCredentials,
        request: VaultRequest,
    ) -> Result<Value, VaultError> {
        let verb = if request.list { "LIST" } else { "GET" };
        self.calls.lock().unwrap().push(format!("{} {}", verb, request.api_path));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = self.failures.lock().unwrap().get(&request.api_path) {
            return Err(error.clone());
        }
        self.answer(&request)
    }
}
