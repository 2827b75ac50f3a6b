//! Search parameters supplied by a collaborator.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::{Error, Result};
use crate::vault::Mount;

pub const DEFAULT_WORKER_COUNT: usize = 48;
pub const MIN_WORKER_COUNT: usize = 8;
pub const MAX_WORKER_COUNT: usize = 64;
pub const DEFAULT_MAX_DEPTH: usize = 10;
pub const MAX_DEPTH_LIMIT: usize = 50;

/// How the term is compared against text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    Contains,
    Exact,
    Regex,
    Fuzzy,
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::Contains => write!(f, "contains"),
            MatchMode::Exact => write!(f, "exact"),
            MatchMode::Regex => write!(f, "regex"),
            MatchMode::Fuzzy => write!(f, "fuzzy"),
        }
    }
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "contains" => Ok(MatchMode::Contains),
            "exact" => Ok(MatchMode::Exact),
            "regex" => Ok(MatchMode::Regex),
            "fuzzy" => Ok(MatchMode::Fuzzy),
            other => Err(format!(
                "unknown match mode '{}', expected contains, exact, regex or fuzzy",
                other
            )),
        }
    }
}

fn default_case_insensitive() -> bool {
    true
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_worker_count() -> usize {
    DEFAULT_WORKER_COUNT
}

/// One search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    #[validate(length(min = 1, max = 1024, message = "Search term must be 1 to 1024 characters"))]
    pub term: String,

    #[serde(default)]
    pub mode: MatchMode,

    #[serde(default = "default_case_insensitive")]
    pub case_insensitive: bool,

    /// Nesting depth scanned inside each secret (clamped to 1..=50)
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Concurrent workers per phase (clamped to 8..=64)
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Only mounts whose path starts with this
    #[serde(default)]
    pub mount_filter: Option<String>,

    /// Only full paths under this prefix (e.g. `secret/prod/`)
    #[serde(default)]
    pub path_prefix_filter: Option<String>,
}

impl SearchQuery {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            mode: MatchMode::default(),
            case_insensitive: default_case_insensitive(),
            max_depth: DEFAULT_MAX_DEPTH,
            worker_count: DEFAULT_WORKER_COUNT,
            mount_filter: None,
            path_prefix_filter: None,
        }
    }

    pub fn with_mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_case_insensitive(mut self, case_insensitive: bool) -> Self {
        self.case_insensitive = case_insensitive;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    pub fn with_mount_filter(mut self, filter: impl Into<String>) -> Self {
        self.mount_filter = Some(filter.into());
        self
    }

    pub fn with_path_prefix_filter(mut self, filter: impl Into<String>) -> Self {
        self.path_prefix_filter = Some(filter.into());
        self
    }

    /// Validate the term and clamp the numeric bounds.
    pub fn normalized(&self) -> Result<Self> {
        self.validate()?;
        if self.term.trim().is_empty() {
            return Err(Error::validation("Search term cannot be blank"));
        }

        Ok(Self {
            term: self.term.clone(),
            mode: self.mode,
            case_insensitive: self.case_insensitive,
            max_depth: self.max_depth.clamp(1, MAX_DEPTH_LIMIT),
            worker_count: self.worker_count.clamp(MIN_WORKER_COUNT, MAX_WORKER_COUNT),
            mount_filter: normalize_filter(self.mount_filter.as_deref()),
            path_prefix_filter: normalize_filter(self.path_prefix_filter.as_deref()),
        })
    }

    /// Whether `mount` participates in the search.
    pub fn selects_mount(&self, mount: &Mount) -> bool {
        match &self.mount_filter {
            Some(filter) => mount.path.starts_with(filter.as_str()) || mount.name() == filter,
            None => true,
        }
    }

    /// Whether the collection at `full_prefix` may contain wanted paths.
    ///
    /// True for prefixes under the filter and for ancestors of it.
    pub fn allows_prefix(&self, full_prefix: &str) -> bool {
        match &self.path_prefix_filter {
            Some(filter) => {
                full_prefix.starts_with(filter.as_str()) || filter.starts_with(full_prefix)
            }
            None => true,
        }
    }

    /// Whether a leaf at `full_path` passes the path-prefix filter.
    pub fn allows_path(&self, full_path: &str) -> bool {
        match &self.path_prefix_filter {
            Some(filter) => full_path.starts_with(filter.as_str()),
            None => true,
        }
    }
}

fn normalize_filter(filter: Option<&str>) -> Option<String> {
    let filter = filter?.trim().trim_start_matches('/');
    if filter.is_empty() {
        None
    } else {
        Some(filter.to_string())
    }
}
