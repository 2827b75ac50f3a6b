//! # Error Handling
//!
//! Error types for the search engine, built with `thiserror`.
//!
//! Two layers exist:
//! - [`VaultError`] classifies a single Vault HTTP call. The lister and reader
//!   inspect it to tell "forbidden" and "not found" apart from real failures.
//! - [`Error`] is the crate-level error returned from engine entry points.

/// Custom result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the search engine
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rejected search parameters
    #[error("Validation error: {0}")]
    Validation(String),

    /// A Vault call failed
    #[error("Vault error: {0}")]
    Vault(#[from] VaultError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal faults (worker panics, broken invariants)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

/// Outcome classification of one Vault HTTP call.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    /// 404 from Vault
    #[error("not found: {path}")]
    NotFound { path: String },

    /// 403 from Vault
    #[error("permission denied: {path}")]
    Forbidden { path: String },

    /// Any other non-success status
    #[error("unexpected status {status} for {path}: {body}")]
    Status { path: String, status: u16, body: String },

    /// The per-call timeout elapsed
    #[error("request timed out: {path}")]
    Timeout { path: String },

    /// Connection-level failure
    #[error("transport failure for {path}: {message}")]
    Transport { path: String, message: String },

    /// The body was not the JSON shape Vault documents
    #[error("malformed response for {path}: {message}")]
    Decode { path: String, message: String },
}

impl VaultError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden { .. })
    }

    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Forbidden { .. } => "forbidden",
            Self::Status { .. } => "status",
            Self::Timeout { .. } => "timeout",
            Self::Transport { .. } => "transport",
            Self::Decode { .. } => "decode",
        }
    }

    /// Build from a non-success HTTP status.
    pub fn from_status(path: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        let path = path.into();
        match status {
            404 => Self::NotFound { path },
            403 => Self::Forbidden { path },
            _ => Self::Status { path, status, body: body.into() },
        }
    }
}
