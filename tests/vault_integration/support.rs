//! Mock Vault server for integration tests
//!
//! Wraps a wiremock server with helpers that answer the KV endpoints the way
//! Vault does. Unmatched requests get wiremock's default 404, which is also
//! what Vault returns for a missing path.

use std::time::Duration;

use serde_json::{json, Value};
use vaultsearch::{EngineConfig, SearchEngine, TaskId, TaskSnapshot, VaultCredentials};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "s.integration-token";

pub struct MockVault {
    pub server: MockServer,
}

impl MockVault {
    pub async fn start() -> Self {
        Self { server: MockServer::start().await }
    }

    pub fn credentials(&self) -> VaultCredentials {
        VaultCredentials::new(self.server.uri(), TOKEN)
    }

    /// `sys/mounts` listing the given `(path, type, version)` entries.
    pub async fn mounts(&self, entries: &[(&str, &str, &str)]) {
        let mut table = serde_json::Map::new();
        for (mount_path, engine, version) in entries {
            table.insert(
                mount_path.to_string(),
                json!({ "type": engine, "options": { "version": version } }),
            );
        }
        let mut body = Value::Object(table.clone());
        body["data"] = Value::Object(table);

        Mock::given(method("GET"))
            .and(path("/v1/sys/mounts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// `LIST /v1/{api_path}` answering `keys`.
    pub async fn list(&self, api_path: &str, keys: &[&str]) {
        Mock::given(method("GET"))
            .and(path(format!("/v1/{}", api_path)))
            .and(query_param("list", "true"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "data": { "keys": keys } })),
            )
            .mount(&self.server)
            .await;
    }

    /// KV v2 secret under `mount` (e.g. `secret/`).
    pub async fn secret_v2(&self, mount: &str, secret_path: &str, data: Value) {
        self.read(
            &format!("{}data/{}", mount, secret_path),
            json!({ "data": { "data": data, "metadata": { "version": 1 } } }),
            None,
        )
        .await;
    }

    /// KV v1 secret under `mount`.
    pub async fn secret_v1(&self, mount: &str, secret_path: &str, data: Value) {
        self.read(&format!("{}{}", mount, secret_path), json!({ "data": data }), None).await;
    }

    /// GET `/v1/{api_path}` answering `body`, optionally after `delay`.
    pub async fn read(&self, api_path: &str, body: Value, delay: Option<Duration>) {
        let mut response = ResponseTemplate::new(200).set_body_json(body);
        if let Some(delay) = delay {
            response = response.set_delay(delay);
        }
        Mock::given(method("GET"))
            .and(path(format!("/v1/{}", api_path)))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    /// Any GET to `/v1/{api_path}` answers `status`.
    pub async fn status(&self, api_path: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path(format!("/v1/{}", api_path)))
            .respond_with(
                ResponseTemplate::new(status).set_body_json(json!({ "errors": ["mock error"] })),
            )
            .mount(&self.server)
            .await;
    }

    /// Paths requested so far, `?list=true` included.
    pub async fn requests(&self) -> Vec<String> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|request| match request.url.query() {
                Some(query) => format!("{}?{}", request.url.path(), query),
                None => request.url.path().to_string(),
            })
            .collect()
    }
}

pub fn engine() -> SearchEngine {
    let config = EngineConfig { list_timeout_seconds: 2, read_timeout_seconds: 2, ..Default::default() };
    SearchEngine::new(config).expect("engine")
}

pub async fn wait_terminal(engine: &SearchEngine, id: &TaskId) -> TaskSnapshot {
    for _ in 0..500 {
        let snapshot = engine.status(id.as_str()).await.expect("task registered");
        if snapshot.status.is_terminal() {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("search {} did not finish", id);
}
