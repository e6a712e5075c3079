//! Projection module
//!
//! Read models derived from event streams, and the service that keeps them
//! current (inline with each command, or by replaying history).

mod dashboard;
mod service;

pub use dashboard::UserDashboardStats;
pub use service::{ProjectionLifecycle, ProjectionService, RebuildReport};

use uuid::Uuid;

use crate::event_store::StoreError;

/// Projection errors
#[derive(Debug, thiserror::Error)]
pub enum ProjectionError {
    /// Event inconsistent with the snapshot it is folded into
    #[error("Sequence violation: {0}")]
    SequenceViolation(String),

    /// Snapshot and stream positions disagree
    #[error("Version gap in stream {stream_id}: expected version {expected}, found {found}")]
    VersionGap {
        stream_id: Uuid,
        expected: i64,
        found: i64,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}
