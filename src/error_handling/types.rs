//! Error type definitions.
//!
//! This module defines all error types used throughout the comparison engine,
//! from remote collaborator failures up to run-level errors.

use std::time::Duration;

use log::SetLoggerError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),
}

/// Kinds of failure a remote catalog call can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum RemoteErrorKind {
    /// The remote side rate-limited the call (HTTP 429/503 equivalent)
    Throttled,
    /// The credential used for the call is no longer accepted
    AuthExpired,
    /// The site or library does not exist
    NotFound,
    /// Network, server or any other failure
    Other,
}

impl RemoteErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteErrorKind::Throttled => "Throttled",
            RemoteErrorKind::AuthExpired => "Authentication expired",
            RemoteErrorKind::NotFound => "Not found",
            RemoteErrorKind::Other => "Remote error",
        }
    }
}

impl std::fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by a `RemoteCatalogClient`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
    /// Server-suggested wait before retrying (Retry-After), when one was given
    pub retry_after: Option<Duration>,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn throttled(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Throttled, message)
    }

    pub fn auth_expired(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::AuthExpired, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::NotFound, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Other, message)
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    pub fn is_throttled(&self) -> bool {
        self.kind == RemoteErrorKind::Throttled
    }

    pub fn is_auth_expired(&self) -> bool {
        self.kind == RemoteErrorKind::AuthExpired
    }
}

/// A comparison configuration that cannot be executed.
///
/// Raised before a run starts; nothing is scanned or persisted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Configuration has no site pairs")]
    NoSitePairs,

    #[error("Configuration has no task id")]
    MissingTaskId,

    #[error("Configuration has no {0} connection")]
    MissingConnection(&'static str),

    #[error("Invalid site URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Errors importing or generating site pairs.
#[derive(Error, Debug)]
pub enum PairImportError {
    #[error("Failed to read site pairs: {0}")]
    Csv(#[from] csv::Error),

    #[error("Site pair file has no '{0}' column")]
    MissingColumn(&'static str),

    #[error("Invalid site URL '{url}' on line {line}: {reason}")]
    InvalidUrl {
        url: String,
        line: u64,
        reason: String,
    },

    #[error("Site URL '{url}' is not on host '{expected_host}'")]
    HostMismatch { url: String, expected_host: String },
}

/// Failure of a single site pair.
///
/// Rendered into the pair's `error_message`; never aborts the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PairError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// No usable credential for a tenant, and re-authentication produced none.
    #[error("Authentication required for tenant '{tenant}'")]
    Authentication { tenant: String },

    /// A panic or other programming error caught at the pair boundary.
    #[error("Unexpected failure: {0}")]
    Unexpected(String),
}

impl PairError {
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, PairError::Remote(e) if e.is_auth_expired())
    }
}

/// Error types for result store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Error creating the database file.
    #[error("Database file creation error: {0}")]
    FileCreationError(String),

    /// SQL execution error.
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),

    /// Schema migration error.
    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    /// A stored result could not be encoded or decoded.
    #[error("Result serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Errors returned by `ComparisonOrchestrator::run`.
///
/// Pair-level failures never surface here; they are recorded on the result.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Validation(#[from] ValidationError),

    #[error("Failed to persist task result: {0}")]
    Store(#[from] StoreError),
}
