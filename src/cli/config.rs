//! Credential resolution for the vaultsearch CLI
//!
//! Follows the Vault CLI's own conventions: flags first, then the `VAULT_*`
//! environment variables, then `~/.vault-token`.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::vault::VaultCredentials;

/// Vault's default listen address
pub const DEFAULT_VAULT_ADDR: &str = "http://127.0.0.1:8200";

/// Location of the token written by `vault login` (~/.vault-token)
pub fn token_helper_path() -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .context("Unable to determine home directory")?;

    let mut path = PathBuf::from(home);
    path.push(".vault-token");
    Ok(path)
}

fn read_token_file(path: &Path) -> Result<String> {
    let token = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read token file: {}", path.display()))?
        .trim()
        .to_string();

    if token.is_empty() {
        anyhow::bail!("Token file is empty: {}", path.display());
    }
    Ok(token)
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Resolve the Vault token
///
/// Checks sources in the following priority order:
/// 1. --token command line flag
/// 2. --token-file command line flag
/// 3. VAULT_TOKEN environment variable
/// 4. ~/.vault-token
pub fn resolve_token(token_flag: Option<String>, token_file_flag: Option<PathBuf>) -> Result<String> {
    if let Some(token) = token_flag {
        debug!("Using token from --token flag");
        return Ok(token);
    }

    if let Some(token_file) = token_file_flag {
        debug!("Reading token from file: {}", token_file.display());
        return read_token_file(&token_file);
    }

    if let Some(token) = non_empty_env("VAULT_TOKEN") {
        debug!("Using token from VAULT_TOKEN environment variable");
        return Ok(token);
    }

    if let Ok(path) = token_helper_path() {
        if path.exists() {
            debug!("Using token from {}", path.display());
            return read_token_file(&path);
        }
    }

    anyhow::bail!(
        "No Vault token found. Please provide a token via:\n\
         - --token flag\n\
         - --token-file flag\n\
         - VAULT_TOKEN environment variable\n\
         - ~/.vault-token (written by `vault login`)"
    )
}

/// Resolve the Vault address: --addr, then VAULT_ADDR, then the local default.
pub fn resolve_addr(addr_flag: Option<String>) -> String {
    if let Some(addr) = addr_flag {
        debug!("Using Vault address from --addr flag: {}", addr);
        return addr;
    }

    if let Some(addr) = non_empty_env("VAULT_ADDR") {
        debug!("Using Vault address from VAULT_ADDR: {}", addr);
        return addr;
    }

    DEFAULT_VAULT_ADDR.to_string()
}

/// Resolve the namespace: --namespace, then VAULT_NAMESPACE.
pub fn resolve_namespace(namespace_flag: Option<String>) -> Option<String> {
    namespace_flag.or_else(|| non_empty_env("VAULT_NAMESPACE"))
}

/// Build validated credentials from flags and environment.
pub fn resolve_credentials(
    addr: Option<String>,
    token: Option<String>,
    token_file: Option<PathBuf>,
    namespace: Option<String>,
) -> Result<VaultCredentials> {
    let token = resolve_token(token, token_file)?;
    let mut credentials = VaultCredentials::new(resolve_addr(addr), token);
    if let Some(namespace) = resolve_namespace(namespace) {
        credentials = credentials.with_namespace(namespace);
    }

    credentials.validate().context("Invalid Vault connection settings")?;
    Ok(credentials)
}
