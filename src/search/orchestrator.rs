//! Two-phase search driver.
//!
//! Phase A walks every selected mount breadth-first with a pool of workers
//! sharing one queue of `{mount, prefix}` units, publishing each leaf whose
//! path matches the term. Phase B starts after Phase A drains and reads every
//! hit, scanning its keys and values.
//!
//! Failures of a single list or read are counted and skipped. Only a worker
//! fault (panic) errors the task.

use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashSet;
use serde_json::Value;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument};

use super::matcher::Matcher;
use super::query::{MatchMode, SearchQuery};
use super::queue::WorkQueue;
use super::task::{ProgressCounters, SearchPhase, TaskHandle, TaskStatus};
use super::traverse::collect_matches_truncated;
use super::types::{PathCandidate, SearchResult};
use crate::config::EngineConfig;
use crate::errors::{Error, Result};
use crate::observability::MetricsRecorder;
use crate::search_span;
use crate::vault::{
    discover_mounts, list_children, read_secret, KvTransport, KvVersion, KvVersionCache,
    ListOutcome, Mount, VaultCredentials,
};

/// One Phase A unit: a collection to list.
#[derive(Debug, Clone)]
struct ListUnit {
    mount: Mount,
    /// Relative to the mount, `""` or ending in `/`
    prefix: String,
}

/// Everything the workers of one search share.
pub(crate) struct SearchContext {
    pub transport: Arc<dyn KvTransport>,
    pub versions: Arc<KvVersionCache>,
    pub config: EngineConfig,
    pub credentials: VaultCredentials,
    /// Already normalized
    pub query: SearchQuery,
    pub task: Arc<TaskHandle>,
}

pub(crate) struct Orchestrator {
    ctx: SearchContext,
    matcher: Matcher,
    seen: DashSet<String>,
    candidates: Mutex<Vec<PathCandidate>>,
    metrics: MetricsRecorder,
}

impl Orchestrator {
    pub(crate) fn new(ctx: SearchContext) -> Self {
        let matcher = Matcher::new(&ctx.query.term, ctx.query.mode, ctx.query.case_insensitive)
            .with_fuzzy_threshold(ctx.config.fuzzy_threshold);
        Self {
            ctx,
            matcher,
            seen: DashSet::new(),
            candidates: Mutex::new(Vec::new()),
            metrics: MetricsRecorder::new(),
        }
    }

    /// Drive the search to a terminal status.
    pub(crate) async fn run(self) {
        let this = Arc::new(self);
        let task = Arc::clone(&this.ctx.task);
        let span = search_span!(
            "search",
            task.id(),
            mode = %this.ctx.query.mode,
            workers = this.ctx.query.worker_count
        );

        async move {
            info!(term_len = this.ctx.query.term.chars().count(), "Search started");
            let outcome = Arc::clone(&this).execute().await;

            match outcome {
                Ok(()) if task.is_cancelled() => {
                    task.finish(TaskStatus::Cancelled, None).await;
                }
                Ok(()) => {
                    task.finish(TaskStatus::Completed, None).await;
                }
                Err(e) => {
                    error!(error = %e, "Search aborted");
                    task.finish(TaskStatus::Errored, Some(e.to_string())).await;
                }
            }

            let status = task.status().await;
            let progress = task.progress().snapshot();
            info!(
                status = %status,
                paths_seen = progress.paths_seen,
                candidates = progress.candidates_total,
                scanned = progress.candidates_scanned,
                list_failures = progress.list_failures,
                read_failures = progress.read_failures,
                "Search finished"
            );
        }
        .instrument(span)
        .await
    }

    async fn execute(self: Arc<Self>) -> Result<()> {
        let task = &self.ctx.task;
        let progress = task.progress();

        if self.ctx.query.mode == MatchMode::Regex && !self.matcher.is_usable() {
            task.add_warning(format!(
                "pattern '{}' is not a valid regular expression; nothing will match",
                self.ctx.query.term
            ))
            .await;
        }

        progress.set_phase(SearchPhase::Discovering);
        let discovery = discover_mounts(
            self.ctx.transport.as_ref(),
            &self.ctx.credentials,
            self.ctx.config.list_timeout(),
        )
        .await;
        if let Some(warning) = discovery.warning {
            task.add_warning(warning).await;
        }
        if task.is_cancelled() {
            return Ok(());
        }

        let mounts: Vec<Mount> = discovery
            .mounts
            .iter()
            .map(|mount| self.ctx.versions.observe(mount))
            .filter(|mount| self.ctx.query.selects_mount(mount))
            .collect();
        if mounts.is_empty() {
            warn!("No KV mounts selected");
        }

        progress.set_phase(SearchPhase::Enumerating);
        let units = mounts.into_iter().map(|mount| ListUnit { mount, prefix: String::new() });
        Arc::clone(&self).enumerate_paths(WorkQueue::from_items(units)).await?;
        if task.is_cancelled() {
            return Ok(());
        }

        let candidates =
            std::mem::take(&mut *self.candidates.lock().unwrap_or_else(PoisonError::into_inner));
        debug!(candidates = candidates.len(), "Path enumeration complete");

        progress.set_phase(SearchPhase::Scanning);
        Arc::clone(&self).scan_candidates(WorkQueue::from_items(candidates)).await
    }

    async fn enumerate_paths(self: Arc<Self>, queue: WorkQueue<ListUnit>) -> Result<()> {
        let queue = Arc::new(queue);
        let phase = self.ctx.task.cancellation().child_token();
        let mut workers = JoinSet::new();

        for _ in 0..self.ctx.query.worker_count {
            let this = Arc::clone(&self);
            let queue = Arc::clone(&queue);
            let phase = phase.clone();
            workers.spawn(
                async move {
                    while let Some(claim) = queue.next(&phase).await {
                        this.list_unit(&claim.item, &queue).await;
                    }
                }
                .instrument(search_span!("enumerate", self.ctx.task.id())),
            );
        }

        join_workers(workers, &phase).await
    }

    async fn scan_candidates(self: Arc<Self>, queue: WorkQueue<PathCandidate>) -> Result<()> {
        let queue = Arc::new(queue);
        let phase = self.ctx.task.cancellation().child_token();
        let mut workers = JoinSet::new();

        for _ in 0..self.ctx.query.worker_count {
            let this = Arc::clone(&self);
            let queue = Arc::clone(&queue);
            let phase = phase.clone();
            workers.spawn(
                async move {
                    while let Some(claim) = queue.next(&phase).await {
                        this.scan_candidate(&claim.item).await;
                    }
                }
                .instrument(search_span!("scan", self.ctx.task.id())),
            );
        }

        join_workers(workers, &phase).await
    }

    async fn list_unit(&self, unit: &ListUnit, queue: &WorkQueue<ListUnit>) {
        let task = &self.ctx.task;
        let progress = task.progress();

        let full_prefix = format!("{}{}", unit.mount.path, unit.prefix);
        if !self.ctx.query.allows_prefix(&full_prefix) {
            return;
        }

        let mount = self.ctx.versions.resolve(&unit.mount);
        let timeout = self.ctx.config.list_timeout();
        let transport = self.ctx.transport.as_ref();
        let credentials = &self.ctx.credentials;

        let listed = list_children(transport, credentials, &mount, &unit.prefix, timeout).await;
        let (mount, outcome) = match listed {
            Ok(ListOutcome::VersionMismatch) => {
                // An empty v2 prefix also answers 404, so only keys under v1 prove the version
                let v1 = mount.with_version(KvVersion::V1);
                match list_children(transport, credentials, &v1, &unit.prefix, timeout).await {
                    Ok(ListOutcome::Keys(keys)) if !keys.is_empty() => {
                        if self.ctx.versions.downgrade_to_v1(&mount.path) {
                            self.metrics.record_version_flip();
                            info!(
                                mount = %mount.path,
                                "Mount answers KV v1 listings, downgraded from v2"
                            );
                        }
                        (v1, Ok(ListOutcome::Keys(keys)))
                    }
                    _ => {
                        debug!(prefix = %full_prefix, "Nothing listed under v2 or v1, prefix is empty");
                        (mount, Ok(ListOutcome::Keys(Vec::new())))
                    }
                }
            }
            other => (mount, other),
        };

        if task.is_cancelled() {
            return;
        }

        let keys = match outcome {
            Ok(ListOutcome::Keys(keys)) => keys,
            Ok(ListOutcome::VersionMismatch) => Vec::new(),
            Err(e) => {
                ProgressCounters::bump(&progress.list_failures);
                warn!(prefix = %full_prefix, error = %e, "Listing failed, skipping prefix");
                return;
            }
        };
        ProgressCounters::bump(&progress.units_listed);

        for key in keys {
            let relative = format!("{}{}", unit.prefix, key);
            if key.ends_with('/') {
                queue.push(ListUnit { mount: mount.clone(), prefix: relative });
                continue;
            }

            let candidate = PathCandidate::new(mount.clone(), relative);
            if !self.ctx.query.allows_path(&candidate.full_path) {
                continue;
            }
            if !self.seen.insert(candidate.full_path.clone()) {
                continue;
            }
            ProgressCounters::bump(&progress.paths_seen);

            if !self.path_qualifies(&candidate.full_path) {
                continue;
            }
            if task.append_path_hit(candidate.clone()).await {
                ProgressCounters::bump(&progress.candidates_total);
                self.candidates.lock().unwrap_or_else(PoisonError::into_inner).push(candidate);
            }
        }
    }

    /// The whole path or any single segment matches.
    fn path_qualifies(&self, full_path: &str) -> bool {
        self.matcher.is_match(Some(full_path))
            || full_path
                .split('/')
                .filter(|segment| !segment.is_empty())
                .any(|segment| self.matcher.is_match(Some(segment)))
    }

    async fn scan_candidate(&self, candidate: &PathCandidate) {
        let task = &self.ctx.task;
        let progress = task.progress();

        let data = match read_secret(
            self.ctx.transport.as_ref(),
            &self.ctx.credentials,
            &self.ctx.versions,
            &candidate.mount,
            &candidate.relative_path,
            self.ctx.config.read_timeout(),
        )
        .await
        {
            Ok(data) => data,
            Err(e) => {
                ProgressCounters::bump(&progress.read_failures);
                debug!(path = %candidate.full_path, error = %e, "Secret unreadable, skipping");
                return;
            }
        };

        if task.is_cancelled() {
            return;
        }
        ProgressCounters::bump(&progress.candidates_scanned);

        let matches = collect_matches_truncated(
            &Value::Object(data),
            &self.matcher,
            self.ctx.query.max_depth,
            self.ctx.config.max_value_chars,
        );
        let mount = self.ctx.versions.resolve(&candidate.mount);
        if let Some(result) =
            SearchResult::from_matches(candidate, &mount, &self.ctx.credentials, matches)
        {
            task.append_result(result).await;
        }
    }
}

/// Wait for every worker. A panicked worker stops the rest of the phase.
async fn join_workers(mut workers: JoinSet<()>, phase: &CancellationToken) -> Result<()> {
    let mut fault = None;
    while let Some(joined) = workers.join_next().await {
        if let Err(e) = joined {
            if e.is_panic() {
                error!(error = %e, "Search worker panicked");
                phase.cancel();
                fault.get_or_insert_with(|| e.to_string());
            }
        }
    }

    match fault {
        Some(message) => Err(Error::internal(format!("search worker failed: {}", message))),
        None => Ok(()),
    }
}
