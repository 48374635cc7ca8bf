//! Error types for the store module.

use std::time::Duration;

use thiserror::Error;

/// Errors from the local (authoritative) store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// The connection mutex was poisoned by a panicking writer.
    #[error("connection lock poisoned: {0}")]
    Poisoned(String),

    /// A blocking task failed to complete.
    #[error("blocking task failed: {0}")]
    Task(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for local store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors from the remote replica.
///
/// None of these are fatal to a caller: the facade degrades to local-only
/// data and surfaces the message as a warning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// No URI configured; the replica is disabled.
    #[error("Mongo URI empty. Saved only in local database.")]
    NotConfigured,

    /// This build has no driver for the remote store.
    #[error("Mongo driver not available in this build. Saved only in local database.")]
    DriverUnavailable,

    /// The call exceeded its time budget.
    #[error("remote store timed out after {0:?}")]
    Timeout(Duration),

    /// Connection, authentication, or query failure.
    #[error("Mongo sync failed: {0}")]
    Backend(String),
}

/// Result type for remote store operations.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;
