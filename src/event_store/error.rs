//! Event Store Errors
//!
//! Error types for event, document and snapshot storage.

use uuid::Uuid;

/// Errors that can occur in the store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Optimistic concurrency conflict
    #[error("Concurrency conflict for stream {stream_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        stream_id: Uuid,
        expected: i64,
        actual: i64,
    },

    /// Non-create event appended to a stream that was never started
    #[error("Stream not found: {0}")]
    StreamNotFound(Uuid),

    /// Create event appended to a stream that already exists
    #[error("Stream already exists: {0}")]
    StreamAlreadyExists(Uuid),

    /// A unique document field is already taken
    #[error("Unique constraint violated on {0}")]
    UniqueViolation(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
