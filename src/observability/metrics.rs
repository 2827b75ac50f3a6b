//! # Metrics Collection
//!
//! Counters for Vault traffic and search outcomes. The library does not
//! install an exporter; recording is a no-op until the host process installs
//! a `metrics` recorder.

use metrics::counter;

/// Records engine metrics through the global `metrics` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsRecorder;

impl MetricsRecorder {
    pub fn new() -> Self {
        Self
    }

    /// Record one Vault API call and how it ended (`ok` or a `VaultError` kind).
    pub fn record_vault_request(&self, operation: &'static str, outcome: &'static str) {
        counter!(
            "vaultsearch_vault_requests_total",
            "operation" => operation,
            "outcome" => outcome
        )
        .increment(1);
    }

    /// Record a search reaching a terminal status.
    pub fn record_search_finished(&self, status: &'static str) {
        counter!("vaultsearch_searches_total", "status" => status).increment(1);
    }

    /// Record a mount whose detected KV version was corrected mid-search.
    pub fn record_version_flip(&self) {
        counter!("vaultsearch_kv_version_flips_total").increment(1);
    }
}
