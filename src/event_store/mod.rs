//! Event Store module
//!
//! Storage contract for event streams, user documents and dashboard
//! snapshots, with PostgreSQL and in-memory implementations.
//!
//! Stream versions start at 1. An append names the version it expects the
//! stream to be at (`Some(0)` for a stream that must not exist yet); a
//! mismatch is a [`StoreError::ConcurrencyConflict`].

mod error;
mod memory;
mod postgres;

pub use error::StoreError;
pub use memory::InMemoryStore;
pub use postgres::PgUserStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::aggregate::{User, UserField};
use crate::domain::{OperationContext, UserEvent};
use crate::projection::UserDashboardStats;

/// Event as persisted in a stream
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredEvent {
    pub id: Uuid,
    pub stream_id: Uuid,
    pub version: i64,
    pub event_type: String,
    pub event: UserEvent,
    pub context: OperationContext,
    pub recorded_at: DateTime<Utc>,
}

/// How a field query compares values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchMode {
    #[default]
    Exact,
    IgnoreCase,
}

/// What a unit of work does to the primary document
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentChange {
    Upsert(User),
    Delete,
}

/// Everything one command writes, committed atomically
#[derive(Debug, Clone)]
pub struct SessionChanges {
    pub stream_id: Uuid,
    pub expected_version: Option<i64>,
    pub event: UserEvent,
    pub document: DocumentChange,
    /// Folded snapshot; `None` when projections are deferred
    pub snapshot: Option<UserDashboardStats>,
    pub context: OperationContext,
}

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append one event and return the stream's new version
    async fn append_event(
        &self,
        stream_id: Uuid,
        event: &UserEvent,
        expected_version: Option<i64>,
        context: &OperationContext,
    ) -> Result<i64, StoreError>;

    /// Full ordered history of a stream; empty when the stream is absent
    async fn read_stream(&self, stream_id: Uuid) -> Result<Vec<StoredEvent>, StoreError>;

    /// Ids of every started stream, oldest first
    async fn stream_ids(&self) -> Result<Vec<Uuid>, StoreError>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn load_document(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn upsert_document(&self, user: &User) -> Result<(), StoreError>;

    async fn delete_document(&self, id: Uuid) -> Result<(), StoreError>;

    async fn query_documents(
        &self,
        field: UserField,
        value: &str,
        mode: MatchMode,
    ) -> Result<Vec<User>, StoreError>;
}

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn load_snapshot(&self, id: Uuid) -> Result<Option<UserDashboardStats>, StoreError>;

    /// Save a snapshot unless a newer version is already stored
    async fn save_snapshot(&self, snapshot: &UserDashboardStats) -> Result<(), StoreError>;

    /// Overwrite the stored snapshot whatever its version (rebuilds)
    async fn replace_snapshot(&self, snapshot: &UserDashboardStats) -> Result<(), StoreError>;
}

/// Full storage collaborator used by the command handlers
#[async_trait]
pub trait UserStore: EventStore + DocumentStore + SnapshotStore {
    /// Apply document change, event append and snapshot write as one unit.
    /// Returns the stream's new version.
    async fn save_changes(&self, changes: SessionChanges) -> Result<i64, StoreError>;
}

/// Validate an append against the stream's current version
pub(crate) fn check_append(
    stream_id: Uuid,
    current_version: i64,
    expected_version: Option<i64>,
    event: &UserEvent,
) -> Result<(), StoreError> {
    if let Some(expected) = expected_version {
        if expected != current_version {
            return Err(StoreError::ConcurrencyConflict {
                stream_id,
                expected,
                actual: current_version,
            });
        }
    }

    match (current_version, event.is_creation()) {
        (0, false) => Err(StoreError::StreamNotFound(stream_id)),
        (v, true) if v > 0 => Err(StoreError::StreamAlreadyExists(stream_id)),
        _ => Ok(()),
    }
}
