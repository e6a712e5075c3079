//! Query Handlers
//!
//! Reads against documents, streams and dashboard snapshots. Looking a user
//! up by email is itself recorded on the user's stream.

use chrono::Utc;
use uuid::Uuid;

use crate::aggregate::{Aggregate, User, UserField};
use crate::domain::{validate_email, OperationContext};
use crate::error::AppError;
use crate::event_store::{DocumentChange, MatchMode, StoredEvent, UserStore};
use crate::projection::{ProjectionService, UserDashboardStats};

use super::session::{commit, load_user, with_conflict_retry};
use super::QueryUserByEmailCommand;

// =========================================================================
// QueryUserByEmailHandler
// =========================================================================

/// Handler for lookups by email
pub struct QueryUserByEmailHandler<'a, S: ?Sized> {
    store: &'a S,
    projection: ProjectionService,
}

impl<'a, S> QueryUserByEmailHandler<'a, S>
where
    S: UserStore + ?Sized,
{
    pub fn new(store: &'a S, projection: ProjectionService) -> Self {
        Self { store, projection }
    }

    /// Find the user and record the lookup. Returns the document as of the
    /// recorded event.
    pub async fn execute(
        &self,
        command: QueryUserByEmailCommand,
        context: &OperationContext,
    ) -> Result<User, AppError> {
        validate_email(&command.email)?;

        with_conflict_retry(|| self.try_execute(&command, context)).await
    }

    async fn try_execute(
        &self,
        command: &QueryUserByEmailCommand,
        context: &OperationContext,
    ) -> Result<User, AppError> {
        let user = self
            .store
            .query_documents(UserField::Email, &command.email, MatchMode::IgnoreCase)
            .await?
            .into_iter()
            .find(User::is_active)
            .ok_or_else(|| {
                AppError::UserNotFound(format!("No user found with email '{}'", command.email))
            })?;

        let event = user.record_email_query(&command.email, Utc::now())?;
        let expected = user.version();
        let user = user.apply(&event);

        commit(
            self.store,
            self.projection,
            user.id(),
            expected,
            event,
            DocumentChange::Upsert(user.clone()),
            context,
        )
        .await?;

        tracing::debug!(user_id = %user.id(), "User queried by email");

        Ok(user)
    }
}

// =========================================================================
// UserQueries
// =========================================================================

/// Side-effect free reads, plus the explicit dashboard rebuild
pub struct UserQueries<'a, S: ?Sized> {
    store: &'a S,
    projection: ProjectionService,
}

impl<'a, S> UserQueries<'a, S>
where
    S: UserStore + ?Sized,
{
    pub fn new(store: &'a S, projection: ProjectionService) -> Self {
        Self { store, projection }
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<User, AppError> {
        load_user(self.store, user_id).await
    }

    /// Stored dashboard snapshot; deleted users stay visible here
    pub async fn get_dashboard(&self, user_id: Uuid) -> Result<UserDashboardStats, AppError> {
        self.store
            .load_snapshot(user_id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(user_id.to_string()))
    }

    /// Full ordered history of a user's stream
    pub async fn fetch_stream(&self, user_id: Uuid) -> Result<Vec<StoredEvent>, AppError> {
        let events = self.store.read_stream(user_id).await?;
        if events.is_empty() {
            return Err(AppError::UserNotFound(user_id.to_string()));
        }
        Ok(events)
    }

    /// Replay the stream from scratch and overwrite the stored snapshot
    pub async fn rebuild_dashboard(&self, user_id: Uuid) -> Result<UserDashboardStats, AppError> {
        self.projection
            .rebuild(self.store, user_id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(user_id.to_string()))
    }
}
