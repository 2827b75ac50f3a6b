//! Entry point for collaborators: start, poll, stream and cancel searches.

use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info};
use validator::Validate;

use super::orchestrator::{Orchestrator, SearchContext};
use super::query::SearchQuery;
use super::registry::TaskRegistry;
use super::task::{TaskId, TaskSnapshot, TaskStatus};
use super::types::SearchEvent;
use crate::config::EngineConfig;
use crate::errors::{Error, Result};
use crate::vault::{KvTransport, KvVersionCache, VaultClient, VaultCredentials};

/// Runs searches against Vault and keeps their state for polling.
///
/// Must be used from within a tokio runtime: each search runs as a spawned
/// task.
pub struct SearchEngine {
    transport: Arc<dyn KvTransport>,
    registry: Arc<TaskRegistry>,
    /// Corrected KV versions per Vault (address and namespace)
    versions: DashMap<String, Arc<KvVersionCache>>,
    config: EngineConfig,
    /// Evicts expired tasks; started with the first search
    sweeper: OnceLock<JoinHandle<()>>,
}

impl SearchEngine {
    /// Engine talking to Vault over HTTP.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate().map_err(|e| Error::config(format!("Invalid engine config: {}", e)))?;
        let client = VaultClient::new()?;
        Ok(Self::with_transport(config, Arc::new(client)))
    }

    pub fn with_transport(config: EngineConfig, transport: Arc<dyn KvTransport>) -> Self {
        let registry = Arc::new(TaskRegistry::new(config.task_retention(), config.event_buffer));
        Self { transport, registry, versions: DashMap::new(), config, sweeper: OnceLock::new() }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    /// Start a search and return its id immediately.
    pub fn start(&self, credentials: &VaultCredentials, query: SearchQuery) -> Result<TaskId> {
        self.start_streaming(credentials, query).map(|(id, _)| id)
    }

    /// Start a search, returning a receiver subscribed before any work runs.
    pub fn start_streaming(
        &self,
        credentials: &VaultCredentials,
        query: SearchQuery,
    ) -> Result<(TaskId, broadcast::Receiver<SearchEvent>)> {
        credentials.validate()?;
        let query = query.normalized()?;
        self.sweeper.get_or_init(|| self.registry.spawn_sweeper(self.config.sweep_interval()));

        let task = self.registry.create(query.clone());
        let events = task.subscribe();
        let id = task.id().clone();

        let orchestrator = Orchestrator::new(SearchContext {
            transport: Arc::clone(&self.transport),
            versions: self.versions_for(credentials),
            config: self.config.clone(),
            credentials: credentials.clone(),
            query,
            task: Arc::clone(&task),
        });

        let search = tokio::spawn(orchestrator.run());
        tokio::spawn(async move {
            if let Err(e) = search.await {
                if e.is_panic() {
                    error!(task_id = %task.id(), error = %e, "Search panicked");
                    task.finish(TaskStatus::Errored, Some(format!("search aborted: {}", e)))
                        .await;
                }
            }
        });

        info!(task_id = %id, "Search task registered");
        Ok((id, events))
    }

    /// Current state of a task, `None` once unknown or expired.
    pub async fn status(&self, id: &str) -> Option<TaskSnapshot> {
        let handle = self.registry.get(id)?;
        Some(handle.snapshot().await)
    }

    /// Attach to the event stream of a task. Events published earlier are not replayed.
    pub fn subscribe(&self, id: &str) -> Option<broadcast::Receiver<SearchEvent>> {
        self.registry.get(id).map(|handle| handle.subscribe())
    }

    pub async fn cancel(&self, id: &str) -> bool {
        self.registry.cancel(id).await
    }

    pub async fn forget(&self, id: &str) -> bool {
        self.registry.forget(id).await
    }

    fn versions_for(&self, credentials: &VaultCredentials) -> Arc<KvVersionCache> {
        let key = format!("{}|{}", credentials.base_url(), credentials.namespace().unwrap_or(""));
        let entry = self.versions.entry(key).or_insert_with(|| Arc::new(KvVersionCache::new()));
        Arc::clone(entry.value())
    }
}

impl Drop for SearchEngine {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.get() {
            sweeper.abort();
        }
    }
}
