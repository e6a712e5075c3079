//! Role Handlers
//!
//! Assigning a role set replaces the document's roles; removing revokes a
//! single assigned role. Both count as one role modification on the
//! dashboard.

use crate::domain::OperationContext;
use crate::error::AppError;
use crate::event_store::UserStore;
use crate::projection::ProjectionService;

use super::session::{decide_and_commit, with_conflict_retry};
use super::{AddRolesCommand, RemoveRoleCommand, UserCommandResult};

// =========================================================================
// AddRolesHandler
// =========================================================================

/// Handler for role assignment
pub struct AddRolesHandler<'a, S: ?Sized> {
    store: &'a S,
    projection: ProjectionService,
}

impl<'a, S> AddRolesHandler<'a, S>
where
    S: UserStore + ?Sized,
{
    pub fn new(store: &'a S, projection: ProjectionService) -> Self {
        Self { store, projection }
    }

    pub async fn execute(
        &self,
        command: AddRolesCommand,
        context: &OperationContext,
    ) -> Result<UserCommandResult, AppError> {
        if command.roles.is_empty() {
            return Err(AppError::InvalidRequest(
                "at least one role is required".to_string(),
            ));
        }

        with_conflict_retry(|| {
            decide_and_commit(self.store, self.projection, command.user_id, context, |user| {
                Ok(user.add_roles(command.roles.iter().cloned())?)
            })
        })
        .await
    }
}

// =========================================================================
// RemoveRoleHandler
// =========================================================================

/// Handler for role revocation
pub struct RemoveRoleHandler<'a, S: ?Sized> {
    store: &'a S,
    projection: ProjectionService,
}

impl<'a, S> RemoveRoleHandler<'a, S>
where
    S: UserStore + ?Sized,
{
    pub fn new(store: &'a S, projection: ProjectionService) -> Self {
        Self { store, projection }
    }

    pub async fn execute(
        &self,
        command: RemoveRoleCommand,
        context: &OperationContext,
    ) -> Result<UserCommandResult, AppError> {
        if command.role.trim().is_empty() {
            return Err(AppError::InvalidRequest("role must not be blank".to_string()));
        }

        with_conflict_retry(|| {
            decide_and_commit(self.store, self.projection, command.user_id, context, |user| {
                Ok(user.remove_role(&command.role)?)
            })
        })
        .await
    }
}
