//! Delete User Handler
//!
//! Removes the user document and appends `UserDeleted`. The event stream and
//! the dashboard snapshot are kept.

use crate::domain::OperationContext;
use crate::error::AppError;
use crate::event_store::UserStore;
use crate::projection::ProjectionService;

use super::session::{decide_and_commit, with_conflict_retry};
use super::{DeleteUserCommand, UserCommandResult};

/// Handler for user deletion
pub struct DeleteUserHandler<'a, S: ?Sized> {
    store: &'a S,
    projection: ProjectionService,
}

impl<'a, S> DeleteUserHandler<'a, S>
where
    S: UserStore + ?Sized,
{
    pub fn new(store: &'a S, projection: ProjectionService) -> Self {
        Self { store, projection }
    }

    /// Execute the delete user command
    pub async fn execute(
        &self,
        command: DeleteUserCommand,
        context: &OperationContext,
    ) -> Result<UserCommandResult, AppError> {
        let result = with_conflict_retry(|| {
            decide_and_commit(self.store, self.projection, command.user_id, context, |user| {
                Ok(user.delete()?)
            })
        })
        .await?;

        tracing::info!(user_id = %command.user_id, version = result.version, "User deleted");

        Ok(result)
    }
}
