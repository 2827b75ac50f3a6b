//! Values produced by a search: path hits, deep results and stream events.

use serde::{Deserialize, Serialize};

use super::task::TaskStatus;
use super::traverse::TraversalMatches;
use crate::vault::{Mount, VaultCredentials};

/// A secret path that passed the Phase A path filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathCandidate {
    pub mount: Mount,
    /// Path within the mount, without the mount prefix
    pub relative_path: String,
    /// `mount.path + relative_path`; unique within one search
    pub full_path: String,
}

impl PathCandidate {
    pub fn new(mount: Mount, relative_path: impl Into<String>) -> Self {
        let relative_path = relative_path.into();
        let full_path = format!("{}{}", mount.path, relative_path);
        Self { mount, relative_path, full_path }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchKind {
    KeyMatch,
    ValueMatch,
}

/// One key or value hit inside a secret.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchEntry {
    /// Locator such as `config.db[0].password`
    pub field_path: String,
    /// Display form of the value at `field_path`, truncated
    pub value: String,
    pub kind: MatchKind,
}

/// A secret with at least one key or value match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub mount: String,
    pub relative_path: String,
    pub full_path: String,
    #[serde(rename = "isKV2")]
    pub is_kv2: bool,
    pub open_url: String,
    pub key_matches: Vec<MatchEntry>,
    pub value_matches: Vec<MatchEntry>,
}

impl SearchResult {
    /// Build a result, or `None` when the traversal found nothing.
    pub fn from_matches(
        candidate: &PathCandidate,
        mount: &Mount,
        credentials: &VaultCredentials,
        matches: TraversalMatches,
    ) -> Option<Self> {
        if matches.is_empty() {
            return None;
        }
        Some(Self {
            mount: mount.path.clone(),
            relative_path: candidate.relative_path.clone(),
            full_path: candidate.full_path.clone(),
            is_kv2: mount.is_kv2(),
            open_url: vault_ui_url(credentials, mount, &candidate.relative_path),
            key_matches: matches.key_matches,
            value_matches: matches.value_matches,
        })
    }

    pub fn match_count(&self) -> usize {
        self.key_matches.len() + self.value_matches.len()
    }
}

/// Deep link into the Vault web UI for one secret.
///
/// `{base}/ui/vault/secrets/{mount}/kv/{encoded path}`, with `?namespace=`
/// appended when the credentials carry a namespace.
pub fn vault_ui_url(credentials: &VaultCredentials, mount: &Mount, relative_path: &str) -> String {
    let url = format!(
        "{}/ui/vault/secrets/{}/kv/{}",
        credentials.base_url(),
        mount.name(),
        urlencoding::encode(relative_path)
    );
    match credentials.namespace() {
        Some(namespace) => format!("{}?namespace={}", url, urlencoding::encode(namespace)),
        None => url,
    }
}

/// Pushed to stream subscribers as the search progresses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SearchEvent {
    PathHit(PathCandidate),
    Result(SearchResult),
    Warning { message: String },
    Finished { status: TaskStatus },
}
