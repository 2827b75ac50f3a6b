//! # Search
//!
//! Two-phase search over Vault KV mounts.
//!
//! - **Phase A** lists every selected mount breadth-first and keeps each leaf
//!   whose full path, or any single path segment, matches the term.
//! - **Phase B** reads each Phase A hit and walks its JSON for matching keys
//!   and values.
//!
//! [`SearchEngine`] is the entry point. Searches run as background tasks kept
//! in a [`TaskRegistry`] so clients can poll, stream, cancel and reattach.

pub mod engine;
pub mod matcher;
pub(crate) mod orchestrator;
pub mod query;
pub(crate) mod queue;
pub mod registry;
pub mod task;
pub mod traverse;
pub mod types;

pub use engine::SearchEngine;
pub use matcher::{matches, similarity, Matcher, DEFAULT_FUZZY_THRESHOLD};
pub use query::{
    MatchMode, SearchQuery, DEFAULT_MAX_DEPTH, DEFAULT_WORKER_COUNT, MAX_DEPTH_LIMIT,
    MAX_WORKER_COUNT, MIN_WORKER_COUNT,
};
pub use registry::TaskRegistry;
pub use task::{SearchPhase, SearchProgress, TaskHandle, TaskId, TaskSnapshot, TaskStatus};
pub use traverse::{collect_matches, collect_matches_truncated, TraversalMatches};
pub use types::{vault_ui_url, MatchEntry, MatchKind, PathCandidate, SearchEvent, SearchResult};
