//! Queue errors.

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::entry::EntryStatus;

/// Queue error types.
#[derive(Debug, Error)]
pub enum QueueError {
    /// No entry with this ID.
    #[error("Queue entry not found: {0}")]
    EntryNotFound(Uuid),

    /// The requested transition is not allowed from the entry's current state.
    #[error("Invalid transition for entry {id}: {from} -> {to}")]
    InvalidTransition {
        id: Uuid,
        from: EntryStatus,
        to: EntryStatus,
    },

    /// The entry was reclaimed and claimed again; the caller's claim is void.
    #[error("Claim on queue entry {0} is no longer held")]
    StaleClaim(Uuid),

    /// Store access failed.
    #[error("Database error: {0}")]
    Database(String),

    /// A stored value could not be mapped back to a queue type.
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// Worker error.
    #[error("Worker error: {0}")]
    Worker(String),

    #[error("Pipeline is already running")]
    AlreadyRunning,

    #[error("Pipeline is not running")]
    NotRunning,

    #[error("Shutdown timed out after {0:?}")]
    ShutdownTimeout(Duration),
}

impl From<tokio_rusqlite::Error> for QueueError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        QueueError::Database(err.to_string())
    }
}

impl From<rusqlite::Error> for QueueError {
    fn from(err: rusqlite::Error) -> Self {
        QueueError::Database(err.to_string())
    }
}
