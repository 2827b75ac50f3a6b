//! Search task state shared between the orchestrator, the registry and
//! stream subscribers.
//!
//! The orchestrator's workers are the only writers. Every append checks the
//! status under the same write lock that terminal transitions take, so
//! nothing is appended once a task is Completed, Errored or Cancelled.

use std::borrow::Borrow;
use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tokio_util::sync::CancellationToken;

use super::query::SearchQuery;
use super::types::{PathCandidate, SearchEvent, SearchResult};
use crate::observability::MetricsRecorder;

/// Opaque task identifier: creation time in milliseconds plus a random suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn generate() -> Self {
        let suffix: String =
            rand::thread_rng().sample_iter(&Alphanumeric).take(8).map(char::from).collect();
        Self(format!("{}-{}", Utc::now().timestamp_millis(), suffix.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TaskId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Running,
    Completed,
    Errored,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        self != TaskStatus::Running
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Errored => "errored",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which stage of the search is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchPhase {
    Discovering,
    Enumerating,
    Scanning,
    Done,
}

impl SearchPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SearchPhase::Discovering,
            1 => SearchPhase::Enumerating,
            2 => SearchPhase::Scanning,
            _ => SearchPhase::Done,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            SearchPhase::Discovering => 0,
            SearchPhase::Enumerating => 1,
            SearchPhase::Scanning => 2,
            SearchPhase::Done => 3,
        }
    }
}

/// Point-in-time progress counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchProgress {
    pub phase: SearchPhase,
    pub units_listed: usize,
    pub list_failures: usize,
    pub paths_seen: usize,
    pub candidates_total: usize,
    pub candidates_scanned: usize,
    pub read_failures: usize,
}

/// Lock-free counters behind [`SearchProgress`].
#[derive(Debug, Default)]
pub struct ProgressCounters {
    phase: AtomicU8,
    pub(crate) units_listed: AtomicUsize,
    pub(crate) list_failures: AtomicUsize,
    pub(crate) paths_seen: AtomicUsize,
    pub(crate) candidates_total: AtomicUsize,
    pub(crate) candidates_scanned: AtomicUsize,
    pub(crate) read_failures: AtomicUsize,
}

impl ProgressCounters {
    pub(crate) fn set_phase(&self, phase: SearchPhase) {
        self.phase.store(phase.as_u8(), Ordering::Relaxed);
    }

    pub(crate) fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SearchProgress {
        SearchProgress {
            phase: SearchPhase::from_u8(self.phase.load(Ordering::Relaxed)),
            units_listed: self.units_listed.load(Ordering::Relaxed),
            list_failures: self.list_failures.load(Ordering::Relaxed),
            paths_seen: self.paths_seen.load(Ordering::Relaxed),
            candidates_total: self.candidates_total.load(Ordering::Relaxed),
            candidates_scanned: self.candidates_scanned.load(Ordering::Relaxed),
            read_failures: self.read_failures.load(Ordering::Relaxed),
        }
    }
}

/// Mutable record of one search.
#[derive(Debug, Clone)]
pub struct SearchTask {
    pub id: TaskId,
    pub status: TaskStatus,
    pub query: SearchQuery,
    pub path_hits: Vec<PathCandidate>,
    pub deep_results: Vec<SearchResult>,
    pub warnings: Vec<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// What `status()` returns to pollers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub status: TaskStatus,
    pub query: SearchQuery,
    pub path_hits: Vec<PathCandidate>,
    pub deep_results: Vec<SearchResult>,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub progress: SearchProgress,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// A registered task: state, cancellation flag and event stream.
#[derive(Debug)]
pub struct TaskHandle {
    id: TaskId,
    state: RwLock<SearchTask>,
    progress: ProgressCounters,
    cancel: CancellationToken,
    events: broadcast::Sender<SearchEvent>,
    terminal_at: OnceLock<Instant>,
}

impl TaskHandle {
    pub fn new(id: TaskId, query: SearchQuery, event_buffer: usize) -> Self {
        let (events, _) = broadcast::channel(event_buffer.max(1));
        let state = SearchTask {
            id: id.clone(),
            status: TaskStatus::Running,
            query,
            path_hits: Vec::new(),
            deep_results: Vec::new(),
            warnings: Vec::new(),
            error: None,
            created_at: Utc::now(),
            finished_at: None,
        };

        Self {
            id,
            state: RwLock::new(state),
            progress: ProgressCounters::default(),
            cancel: CancellationToken::new(),
            events,
            terminal_at: OnceLock::new(),
        }
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn progress(&self) -> &ProgressCounters {
        &self.progress
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SearchEvent> {
        self.events.subscribe()
    }

    /// Append a Phase A hit. Returns `false` once the task is terminal.
    pub async fn append_path_hit(&self, candidate: PathCandidate) -> bool {
        let mut state = self.state.write().await;
        if state.status.is_terminal() || self.cancel.is_cancelled() {
            return false;
        }
        state.path_hits.push(candidate.clone());
        let _ = self.events.send(SearchEvent::PathHit(candidate));
        true
    }

    /// Append a Phase B result. Returns `false` once the task is terminal.
    pub async fn append_result(&self, result: SearchResult) -> bool {
        let mut state = self.state.write().await;
        if state.status.is_terminal() || self.cancel.is_cancelled() {
            return false;
        }
        state.deep_results.push(result.clone());
        let _ = self.events.send(SearchEvent::Result(result));
        true
    }

    pub async fn add_warning(&self, message: impl Into<String>) {
        let message = message.into();
        let mut state = self.state.write().await;
        if state.status.is_terminal() {
            return;
        }
        state.warnings.push(message.clone());
        let _ = self.events.send(SearchEvent::Warning { message });
    }

    /// Move to a terminal status. Only the first call has any effect.
    pub async fn finish(&self, status: TaskStatus, error: Option<String>) -> bool {
        debug_assert!(status.is_terminal());
        let mut state = self.state.write().await;
        if state.status.is_terminal() {
            return false;
        }
        state.status = status;
        state.error = if status == TaskStatus::Errored { error } else { None };
        state.finished_at = Some(Utc::now());
        let _ = self.terminal_at.set(Instant::now());
        self.progress.set_phase(SearchPhase::Done);
        let _ = self.events.send(SearchEvent::Finished { status });
        MetricsRecorder::new().record_search_finished(status.as_str());
        true
    }

    /// Raise the cancellation flag and mark the task Cancelled.
    pub async fn cancel(&self) -> bool {
        self.cancel.cancel();
        self.finish(TaskStatus::Cancelled, None).await
    }

    pub async fn status(&self) -> TaskStatus {
        self.state.read().await.status
    }

    pub async fn snapshot(&self) -> TaskSnapshot {
        let state = self.state.read().await;
        TaskSnapshot {
            id: state.id.clone(),
            status: state.status,
            query: state.query.clone(),
            path_hits: state.path_hits.clone(),
            deep_results: state.deep_results.clone(),
            warnings: state.warnings.clone(),
            error: state.error.clone(),
            progress: self.progress.snapshot(),
            created_at: state.created_at,
            finished_at: state.finished_at,
        }
    }

    /// Terminal for at least `retention` as of `now`.
    pub fn is_expired(&self, retention: Duration, now: Instant) -> bool {
        self.terminal_at.get().is_some_and(|at| now.saturating_duration_since(*at) >= retention)
    }
}
