//! User Creation Handler
//!
//! Creates the user document and starts its event stream in one unit.

use chrono::Utc;

use crate::aggregate::{User, UserField};
use crate::domain::OperationContext;
use crate::error::AppError;
use crate::event_store::{DocumentChange, MatchMode, UserStore};
use crate::projection::ProjectionService;

use super::session::{commit, with_conflict_retry};
use super::{CreateUserCommand, CreateUserResult};

/// Handler for user creation
pub struct CreateUserHandler<'a, S: ?Sized> {
    store: &'a S,
    projection: ProjectionService,
}

impl<'a, S> CreateUserHandler<'a, S>
where
    S: UserStore + ?Sized,
{
    pub fn new(store: &'a S, projection: ProjectionService) -> Self {
        Self { store, projection }
    }

    /// Execute the create user command
    pub async fn execute(
        &self,
        command: CreateUserCommand,
        context: &OperationContext,
    ) -> Result<CreateUserResult, AppError> {
        command.profile.validate()?;

        with_conflict_retry(|| self.try_execute(&command, context)).await
    }

    async fn try_execute(
        &self,
        command: &CreateUserCommand,
        context: &OperationContext,
    ) -> Result<CreateUserResult, AppError> {
        // Email is unique regardless of case
        let existing = self
            .store
            .query_documents(UserField::Email, &command.profile.email, MatchMode::IgnoreCase)
            .await?;
        if !existing.is_empty() {
            tracing::info!(email = %command.profile.email, "Rejected duplicate user");
            return Err(AppError::UserAlreadyExists(command.profile.email.clone()));
        }

        let (user, event) = User::create(command.user_id, command.profile.clone(), Utc::now());

        let version = commit(
            self.store,
            self.projection,
            command.user_id,
            0,
            event,
            DocumentChange::Upsert(user),
            context,
        )
        .await?;

        tracing::info!(user_id = %command.user_id, "User created");

        Ok(CreateUserResult {
            user_id: command.user_id,
            version,
        })
    }
}
