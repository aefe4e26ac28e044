//! Settings Resolution Service Error Hierarchy
//!
//! Defines error types for the layered settings engine, categorized by
//! collaborator boundary and operational concerns.

use std::path::PathBuf;

use config::ConfigError;
use tokio::task::JoinError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Infrastructure-level failures (storage, serialization, dispatch)
    #[error(transparent)]
    System(#[from] SystemError),

    /// Service configuration validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Per-request resolution failures surfaced to the caller
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    // Storage layer
    #[error("Storage operation failed")]
    Storage(#[from] StorageError),

    // Query collaborator boundary
    #[error("Query collaborator error: {0}")]
    Query(#[from] QueryError),

    // Notification fan-out
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("General server error: {0}")]
    GeneralServer(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Disk I/O failures during cache/schema/exclude-list operations
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error("Error occurred at path: {path}")]
    PathError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Serialization failures for persisted data
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    /// Embedded database errors
    #[error("Embedded database error: {0}")]
    DbError(String),

    /// Rendered file-cache failures
    #[error("Cache operation failed: {0}")]
    Cache(String),
}

/// Failures at the query-collaborator boundary. The core never retries
/// these; retry policy belongs to the transport collaborator.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Transport-level dispatch failure (collaborator unreachable)
    #[error("Query collaborator unavailable: {0}")]
    Unavailable(String),

    /// Unexpected shape in a collaborator response
    #[error("Malformed collaborator response: {0}")]
    BadShape(String),

    /// Query referenced a record kind the store does not know
    #[error("Unknown record kind: {0}")]
    UnknownKind(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Unparsable or structurally invalid request payload
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// The entire request yielded zero matched keys
    #[error("No value resolved for any requested key in category '{category}'")]
    NoMatch { category: String },
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Waiter reply channel is gone or full; fan-out continues best-effort
    #[error("Failed to deliver notification to waiter {waiter_id}")]
    DeliveryFailed { waiter_id: u64 },

    /// Engine event channel closed before a reply could be sent
    #[error("Reply channel closed: {0}")]
    ChannelClosed(String),

    #[error("Background task failed: {0}")]
    TaskFailed(#[from] JoinError),
}

// ============== Conversion Implementations ============== //
impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Error::System(SystemError::Storage(e))
    }
}

impl From<QueryError> for Error {
    fn from(e: QueryError) -> Self {
        Error::System(SystemError::Query(e))
    }
}

impl From<DispatchError> for Error {
    fn from(e: DispatchError) -> Self {
        Error::System(SystemError::Dispatch(e))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        StorageError::IoError(e).into()
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        StorageError::JsonError(e).into()
    }
}

impl From<sled::Error> for Error {
    fn from(err: sled::Error) -> Self {
        StorageError::DbError(err.to_string()).into()
    }
}

impl From<JoinError> for Error {
    fn from(err: JoinError) -> Self {
        DispatchError::TaskFailed(err).into()
    }
}
