//! Vault connection credentials passed into every engine call.

use crate::errors::{Error, Result};

/// Address, token and optional namespace for one Vault.
///
/// The engine never stores credentials beyond a single search; acquiring and
/// refreshing the token is the caller's job.
#[derive(Clone, PartialEq, Eq)]
pub struct VaultCredentials {
    base_url: String,
    token: String,
    namespace: Option<String>,
}

impl VaultCredentials {
    /// `base_url` is the Vault origin (e.g. `https://vault.example.com:8200`).
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            token: token.into(),
            namespace: None,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let namespace = namespace.trim().trim_matches('/');
        self.namespace = if namespace.is_empty() { None } else { Some(namespace.to_string()) };
        self
    }

    /// Read `VAULT_ADDR`, `VAULT_TOKEN` and `VAULT_NAMESPACE`.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("VAULT_ADDR")
            .map_err(|_| Error::config("VAULT_ADDR is not set"))?;
        let token =
            std::env::var("VAULT_TOKEN").map_err(|_| Error::config("VAULT_TOKEN is not set"))?;

        let credentials = Self::new(base_url, token);
        let credentials = match std::env::var("VAULT_NAMESPACE") {
            Ok(ns) => credentials.with_namespace(ns),
            Err(_) => credentials,
        };
        credentials.validate()?;
        Ok(credentials)
    }

    /// Reject credentials that cannot produce a request.
    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(Error::config(format!(
                "Vault address must start with http:// or https:// (got '{}')",
                self.base_url
            )));
        }
        if self.token.trim().is_empty() {
            return Err(Error::config("Vault token cannot be empty"));
        }
        Ok(())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }
}

impl std::fmt::Debug for VaultCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultCredentials")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .field("namespace", &self.namespace)
            .finish()
    }
}
