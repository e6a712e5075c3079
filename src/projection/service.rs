//! Projection Service
//!
//! Keeps dashboard snapshots in step with event streams.
//! This is the "P" in CQRS - projections for queries.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use crate::domain::UserEvent;
use crate::event_store::{EventStore, SnapshotStore, StoreError};

use super::{ProjectionError, UserDashboardStats};

/// When snapshots are updated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProjectionLifecycle {
    /// Folded inside the same unit of work as the append
    #[default]
    Inline,
    /// Left to the catch-up job or an explicit rebuild
    Deferred,
}

impl FromStr for ProjectionLifecycle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inline" => Ok(Self::Inline),
            "deferred" | "async" => Ok(Self::Deferred),
            other => Err(format!("unknown projection lifecycle '{other}'")),
        }
    }
}

impl fmt::Display for ProjectionLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inline => write!(f, "inline"),
            Self::Deferred => write!(f, "deferred"),
        }
    }
}

/// Outcome of rebuilding many streams
#[derive(Debug, Clone, Default)]
pub struct RebuildReport {
    pub rebuilt: usize,
    pub skipped: usize,
    pub failed: Vec<(Uuid, String)>,
}

/// Projection Service for updating read models
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectionService {
    lifecycle: ProjectionLifecycle,
}

impl ProjectionService {
    pub fn new(lifecycle: ProjectionLifecycle) -> Self {
        Self { lifecycle }
    }

    pub fn lifecycle(&self) -> ProjectionLifecycle {
        self.lifecycle
    }

    /// Fold an event that is about to be appended at `version`.
    ///
    /// Returns `None` when projections are deferred. A snapshot that lags the
    /// stream is rebuilt from history before the new event is folded. A
    /// snapshot already at `version` means either a concurrent writer got
    /// there first (a store conflict, retried by the caller) or the snapshot
    /// is ahead of the stream, which is a sequence violation until rebuilt.
    pub async fn project_pending<S>(
        &self,
        store: &S,
        stream_id: Uuid,
        version: i64,
        event: &UserEvent,
    ) -> Result<Option<UserDashboardStats>, ProjectionError>
    where
        S: EventStore + SnapshotStore + ?Sized,
    {
        if self.lifecycle == ProjectionLifecycle::Deferred {
            return Ok(None);
        }

        let mut current = store.load_snapshot(stream_id).await?;
        let folded_up_to = current.as_ref().map_or(0, |view| view.version);

        if folded_up_to >= version {
            let stream_version = store
                .read_stream(stream_id)
                .await?
                .last()
                .map_or(0, |stored| stored.version);

            if stream_version >= version {
                return Err(StoreError::ConcurrencyConflict {
                    stream_id,
                    expected: version - 1,
                    actual: stream_version,
                }
                .into());
            }

            let error = ProjectionError::SequenceViolation(format!(
                "snapshot at version {folded_up_to} is ahead of stream at version {stream_version}"
            ));
            report(stream_id, &error);
            return Err(error);
        }

        if folded_up_to + 1 < version {
            tracing::warn!(
                stream_id = %stream_id,
                snapshot_version = folded_up_to,
                pending_version = version,
                "Snapshot lags stream, rebuilding before inline fold"
            );
            let history = store.read_stream(stream_id).await?;
            current = UserDashboardStats::rebuild(&history).inspect_err(|e| report(stream_id, e))?;
        }

        let view = UserDashboardStats::fold_at(current, stream_id, version, event)
            .inspect_err(|e| report(stream_id, e))?;

        Ok(Some(view))
    }

    /// Replay a stream from scratch and overwrite the stored snapshot
    pub async fn rebuild<S>(
        &self,
        store: &S,
        stream_id: Uuid,
    ) -> Result<Option<UserDashboardStats>, ProjectionError>
    where
        S: EventStore + SnapshotStore + ?Sized,
    {
        let history = store.read_stream(stream_id).await?;
        let Some(view) =
            UserDashboardStats::rebuild(&history).inspect_err(|e| report(stream_id, e))?
        else {
            return Ok(None);
        };

        store.replace_snapshot(&view).await?;

        tracing::info!(
            stream_id = %stream_id,
            version = view.version,
            events = history.len(),
            "Dashboard snapshot rebuilt"
        );

        Ok(Some(view))
    }

    /// Rebuild every stream; failures are collected, not fatal
    pub async fn rebuild_all<S>(&self, store: &S) -> Result<RebuildReport, ProjectionError>
    where
        S: EventStore + SnapshotStore + ?Sized,
    {
        let mut report = RebuildReport::default();

        for stream_id in store.stream_ids().await? {
            match self.rebuild(store, stream_id).await {
                Ok(Some(_)) => report.rebuilt += 1,
                Ok(None) => report.skipped += 1,
                Err(e) => report.failed.push((stream_id, e.to_string())),
            }
        }

        Ok(report)
    }
}

/// Sequence violations mean a bug or corrupted history; never swallow them
fn report(stream_id: Uuid, error: &ProjectionError) {
    match error {
        ProjectionError::SequenceViolation(_) | ProjectionError::VersionGap { .. } => {
            tracing::error!(stream_id = %stream_id, error = %error, "Projection fold rejected event");
        }
        ProjectionError::Store(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OperationContext;
    use crate::event_store::InMemoryStore;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn created(id: Uuid) -> UserEvent {
        UserEvent::UserCreated {
            user_id: id,
            name: "Ann".to_string(),
            email: "ann@x.com".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_lifecycle_parsing() {
        assert_eq!("inline".parse::<ProjectionLifecycle>(), Ok(ProjectionLifecycle::Inline));
        assert_eq!(
            " Deferred ".parse::<ProjectionLifecycle>(),
            Ok(ProjectionLifecycle::Deferred)
        );
        assert!("sometimes".parse::<ProjectionLifecycle>().is_err());
        assert_eq!(ProjectionLifecycle::default(), ProjectionLifecycle::Inline);
    }

    #[tokio::test]
    async fn test_deferred_skips_fold() {
        let store = InMemoryStore::new();
        let service = ProjectionService::new(ProjectionLifecycle::Deferred);
        let id = Uuid::new_v4();

        let view = service
            .project_pending(&store, id, 1, &created(id))
            .await
            .unwrap();
        assert!(view.is_none());
    }

    #[tokio::test]
    async fn test_lagging_snapshot_is_rebuilt_before_fold() {
        let store = InMemoryStore::new();
        let context = OperationContext::new();
        let id = Uuid::new_v4();

        // Two events stored, no snapshot at all
        store.append_event(id, &created(id), Some(0), &context).await.unwrap();
        let adjust = UserEvent::UserWalletBalanceAdjusted { amount: dec!(7) };
        store.append_event(id, &adjust, None, &context).await.unwrap();

        let service = ProjectionService::default();
        let view = service
            .project_pending(&store, id, 3, &adjust)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(view.version, 3);
        assert_eq!(view.current_total_wallet_balance, dec!(14));
    }

    #[tokio::test]
    async fn test_rebuild_saves_snapshot() {
        let store = InMemoryStore::new();
        let id = Uuid::new_v4();
        store
            .append_event(id, &created(id), Some(0), &OperationContext::new())
            .await
            .unwrap();

        let service = ProjectionService::default();
        let view = service.rebuild(&store, id).await.unwrap().unwrap();

        assert_eq!(store.load_snapshot(id).await.unwrap(), Some(view));
        assert!(service.rebuild(&store, Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_snapshot_ahead_of_stream_is_sequence_violation() {
        let store = InMemoryStore::new();
        let id = Uuid::new_v4();
        store
            .append_event(id, &created(id), Some(0), &OperationContext::new())
            .await
            .unwrap();
        let view = UserDashboardStats::fold(None, &created(id)).unwrap();
        store
            .save_snapshot(&UserDashboardStats { version: 9, ..view })
            .await
            .unwrap();

        let adjust = UserEvent::UserWalletBalanceAdjusted { amount: dec!(1) };
        let result = ProjectionService::default()
            .project_pending(&store, id, 2, &adjust)
            .await;
        assert!(matches!(result, Err(ProjectionError::SequenceViolation(_))));
    }

    #[tokio::test]
    async fn test_stale_pending_version_is_store_conflict() {
        let store = InMemoryStore::new();
        let context = OperationContext::new();
        let id = Uuid::new_v4();
        let adjust = UserEvent::UserWalletBalanceAdjusted { amount: dec!(1) };
        store.append_event(id, &created(id), Some(0), &context).await.unwrap();
        store.append_event(id, &adjust, Some(1), &context).await.unwrap();
        let service = ProjectionService::default();
        service.rebuild(&store, id).await.unwrap();

        // A writer that loaded the document at version 1 lost the race
        let result = service.project_pending(&store, id, 2, &adjust).await;
        assert!(matches!(
            result,
            Err(ProjectionError::Store(StoreError::ConcurrencyConflict { actual: 2, .. }))
        ));
    }

    #[tokio::test]
    async fn test_rebuild_all_counts_streams() {
        let store = InMemoryStore::new();
        let context = OperationContext::new();
        for _ in 0..3 {
            let id = Uuid::new_v4();
            store.append_event(id, &created(id), Some(0), &context).await.unwrap();
        }

        let report = ProjectionService::default().rebuild_all(&store).await.unwrap();
        assert_eq!(report.rebuilt, 3);
        assert!(report.failed.is_empty());
    }
}
