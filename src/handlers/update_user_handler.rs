//! Update User Handler
//!
//! Full replacement of a user's profile fields.

use crate::aggregate::{Aggregate, UserField};
use crate::domain::OperationContext;
use crate::error::AppError;
use crate::event_store::{MatchMode, UserStore};
use crate::projection::ProjectionService;

use super::session::{commit, load_user, next_document, with_conflict_retry};
use super::{UpdateUserCommand, UserCommandResult};

/// Handler for user updates
pub struct UpdateUserHandler<'a, S: ?Sized> {
    store: &'a S,
    projection: ProjectionService,
}

impl<'a, S> UpdateUserHandler<'a, S>
where
    S: UserStore + ?Sized,
{
    pub fn new(store: &'a S, projection: ProjectionService) -> Self {
        Self { store, projection }
    }

    /// Execute the update user command
    pub async fn execute(
        &self,
        command: UpdateUserCommand,
        context: &OperationContext,
    ) -> Result<UserCommandResult, AppError> {
        command.profile.validate()?;

        with_conflict_retry(|| self.try_execute(&command, context)).await
    }

    async fn try_execute(
        &self,
        command: &UpdateUserCommand,
        context: &OperationContext,
    ) -> Result<UserCommandResult, AppError> {
        let user = load_user(self.store, command.user_id).await?;

        // A changed email must not collide with another user's
        if !user.has_email(&command.profile.email) {
            let taken = self
                .store
                .query_documents(UserField::Email, &command.profile.email, MatchMode::IgnoreCase)
                .await?
                .iter()
                .any(|other| other.id() != user.id());
            if taken {
                return Err(AppError::UserAlreadyExists(command.profile.email.clone()));
            }
        }

        let event = user.update(command.profile.clone())?;
        let event_type = event.event_type().to_string();
        let expected = user.version();
        let document = next_document(user, &event);

        let version = commit(
            self.store,
            self.projection,
            command.user_id,
            expected,
            event,
            document,
            context,
        )
        .await?;

        tracing::info!(user_id = %command.user_id, version, "User profile updated");

        Ok(UserCommandResult {
            user_id: command.user_id,
            version,
            event_type,
        })
    }
}
