//! Error types for the storage layer

use sparkmill_domain::JobTransitionError;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Job record not found
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// A job with this id already exists
    #[error("Job already exists: {0}")]
    DuplicateJob(String),

    /// The job state machine rejected the change
    #[error(transparent)]
    Transition(#[from] JobTransitionError),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// JSON encoding or decoding failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store is not accepting writes
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A lock was poisoned by a panicking writer
    #[error("Store lock poisoned")]
    LockPoisoned,
}
