//! HTTP transport for the Vault API.
//!
//! [`KvTransport`] is the seam between the search engine and Vault: every
//! list, read and mount catalog call goes through a single `get`. The
//! production implementation, [`VaultClient`], speaks HTTP via reqwest and
//! classifies failures into [`VaultError`] so callers can branch on 403/404.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::trace;

use super::credentials::VaultCredentials;
use crate::errors::{Error, Result, VaultError};
use crate::observability::MetricsRecorder;

/// One GET against `/v1/{api_path}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultRequest {
    /// Metrics label: `mounts`, `list` or `read`
    pub operation: &'static str,
    /// Path below `/v1/`, unencoded (e.g. `secret/metadata/prod/`)
    pub api_path: String,
    /// Append `?list=true`
    pub list: bool,
    pub timeout: Duration,
}

impl VaultRequest {
    pub fn read(operation: &'static str, api_path: impl Into<String>, timeout: Duration) -> Self {
        Self { operation, api_path: api_path.into(), list: false, timeout }
    }

    pub fn list(api_path: impl Into<String>, timeout: Duration) -> Self {
        Self { operation: "list", api_path: api_path.into(), list: true, timeout }
    }
}

/// Transport used by the mount catalog, lister and reader.
#[async_trait]
pub trait KvTransport: Send + Sync {
    /// Perform the request and return the decoded JSON body.
    async fn get(
        &self,
        credentials: &VaultCredentials,
        request: VaultRequest,
    ) -> std::result::Result<Value, VaultError>;
}

/// reqwest-backed [`KvTransport`].
#[derive(Debug, Clone)]
pub struct VaultClient {
    http: Client,
    metrics: MetricsRecorder,
}

impl VaultClient {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("vaultsearch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, metrics: MetricsRecorder::new() })
    }

    async fn send(
        &self,
        credentials: &VaultCredentials,
        request: &VaultRequest,
    ) -> std::result::Result<Value, VaultError> {
        let url = format!("{}/v1/{}", credentials.base_url(), encode_api_path(&request.api_path));
        trace!(url = %url, list = request.list, "Vault request");

        let mut builder = self
            .http
            .get(&url)
            .timeout(request.timeout)
            .header("X-Vault-Token", credentials.token());
        if let Some(namespace) = credentials.namespace() {
            builder = builder.header("X-Vault-Namespace", namespace);
        }
        if request.list {
            builder = builder.query(&[("list", "true")]);
        }

        let response =
            builder.send().await.map_err(|e| classify_transport(&request.api_path, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VaultError::from_status(&request.api_path, status.as_u16(), body));
        }

        response.json::<Value>().await.map_err(|e| {
            if e.is_timeout() {
                VaultError::Timeout { path: request.api_path.clone() }
            } else {
                VaultError::Decode { path: request.api_path.clone(), message: e.to_string() }
            }
        })
    }
}

#[async_trait]
impl KvTransport for VaultClient {
    async fn get(
        &self,
        credentials: &VaultCredentials,
        request: VaultRequest,
    ) -> std::result::Result<Value, VaultError> {
        let result = self.send(credentials, &request).await;
        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        };
        self.metrics.record_vault_request(request.operation, outcome);
        result
    }
}

/// Percent-encode each `/`-separated segment, keeping the separators.
pub fn encode_api_path(api_path: &str) -> String {
    api_path.split('/').map(urlencoding::encode).collect::<Vec<_>>().join("/")
}

fn classify_transport(path: &str, error: reqwest::Error) -> VaultError {
    if error.is_timeout() {
        VaultError::Timeout { path: path.to_string() }
    } else {
        VaultError::Transport { path: path.to_string(), message: error.to_string() }
    }
}
