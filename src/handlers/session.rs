//! Unit-of-work plumbing shared by the command handlers.

use std::future::Future;
use std::time::Duration;

use uuid::Uuid;

use crate::aggregate::{Aggregate, User};
use crate::domain::{OperationContext, UserEvent};
use crate::error::AppError;
use crate::event_store::{DocumentChange, SessionChanges, StoreError, UserStore};
use crate::projection::{ProjectionError, ProjectionService};

use super::UserCommandResult;

const MAX_RETRIES: u32 = 3;

/// Run a whole load/decide/save attempt, re-running it on version conflicts
pub(crate) async fn with_conflict_retry<T, F, Fut>(mut attempt: F) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    for n in 0..MAX_RETRIES {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_conflict() && n < MAX_RETRIES - 1 => {
                let delay = Duration::from_millis(50 * (n as u64 + 1));
                tracing::warn!(
                    error = %e,
                    "Concurrency conflict, retrying (attempt {}/{})",
                    n + 1,
                    MAX_RETRIES
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) if e.is_conflict() => return Err(AppError::VersionConflict),
            Err(e) => return Err(e),
        }
    }

    Err(AppError::VersionConflict)
}

/// Load a live user document
pub(crate) async fn load_user<S>(store: &S, user_id: Uuid) -> Result<User, AppError>
where
    S: UserStore + ?Sized,
{
    store
        .load_document(user_id)
        .await?
        .filter(User::is_active)
        .ok_or_else(|| AppError::UserNotFound(user_id.to_string()))
}

/// Fold (when inline) and commit one event with its document change
pub(crate) async fn commit<S>(
    store: &S,
    projection: ProjectionService,
    stream_id: Uuid,
    expected_version: i64,
    event: UserEvent,
    document: DocumentChange,
    context: &OperationContext,
) -> Result<i64, AppError>
where
    S: UserStore + ?Sized,
{
    let snapshot = projection
        .project_pending(store, stream_id, expected_version + 1, &event)
        .await
        .map_err(|e| match e {
            ProjectionError::Store(err) => rejection(err, stream_id),
            other => AppError::Projection(other),
        })?;

    let changes = SessionChanges {
        stream_id,
        expected_version: Some(expected_version),
        event,
        document,
        snapshot,
        context: context.clone(),
    };

    store
        .save_changes(changes)
        .await
        .map_err(|e| rejection(e, stream_id))
}

/// Load the user, decide one event against it and commit the result
pub(crate) async fn decide_and_commit<S, D>(
    store: &S,
    projection: ProjectionService,
    user_id: Uuid,
    context: &OperationContext,
    decide: D,
) -> Result<UserCommandResult, AppError>
where
    S: UserStore + ?Sized,
    D: FnOnce(&User) -> Result<UserEvent, AppError>,
{
    let user = load_user(store, user_id).await?;
    let event = decide(&user)?;
    let event_type = event.event_type().to_string();
    let expected = user.version();
    let document = next_document(user, &event);

    let version = commit(store, projection, user_id, expected, event, document, context).await?;

    tracing::debug!(user_id = %user_id, version, event_type = %event_type, "Command committed");

    Ok(UserCommandResult {
        user_id,
        version,
        event_type,
    })
}

/// Give store errors their request-level meaning
fn rejection(err: StoreError, stream_id: Uuid) -> AppError {
    match err {
        StoreError::UniqueViolation(field) => {
            AppError::UserAlreadyExists(format!("{field} is already registered"))
        }
        StoreError::StreamAlreadyExists(id) => AppError::UserAlreadyExists(id.to_string()),
        StoreError::StreamNotFound(_) => AppError::UserNotFound(stream_id.to_string()),
        other => AppError::Store(other),
    }
}

/// Document state after `event`, ready to be written
pub(crate) fn next_document(user: User, event: &UserEvent) -> DocumentChange {
    let user = user.apply(event);
    if user.is_active() {
        DocumentChange::Upsert(user)
    } else {
        DocumentChange::Delete
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn conflict() -> AppError {
        AppError::Store(StoreError::ConcurrencyConflict {
            stream_id: Uuid::new_v4(),
            expected: 1,
            actual: 2,
        })
    }

    #[tokio::test]
    async fn test_retry_recovers_after_conflict() {
        let calls = AtomicU32::new(0);
        let result = with_conflict_retry(|| async {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(conflict())
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_gives_up_with_version_conflict() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_conflict_retry(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(conflict())
        })
        .await;

        assert!(matches!(result, Err(AppError::VersionConflict)));
        assert_eq!(calls.load(Ordering::SeqCst), MAX_RETRIES);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_conflict_retry(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::InvalidRequest("bad".into()))
        })
        .await;

        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unique_violation_becomes_already_exists() {
        let err = rejection(StoreError::UniqueViolation("email".into()), Uuid::new_v4());
        assert!(matches!(err, AppError::UserAlreadyExists(_)));
    }
}
