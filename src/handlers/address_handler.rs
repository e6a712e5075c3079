//! Modify Address Handler

use crate::domain::OperationContext;
use crate::error::AppError;
use crate::event_store::UserStore;
use crate::projection::ProjectionService;

use super::session::{decide_and_commit, with_conflict_retry};
use super::{ModifyAddressCommand, UserCommandResult};

/// Handler for address changes
pub struct ModifyAddressHandler<'a, S: ?Sized> {
    store: &'a S,
    projection: ProjectionService,
}

impl<'a, S> ModifyAddressHandler<'a, S>
where
    S: UserStore + ?Sized,
{
    pub fn new(store: &'a S, projection: ProjectionService) -> Self {
        Self { store, projection }
    }

    pub async fn execute(
        &self,
        command: ModifyAddressCommand,
        context: &OperationContext,
    ) -> Result<UserCommandResult, AppError> {
        command.address.validate()?;

        with_conflict_retry(|| {
            decide_and_commit(self.store, self.projection, command.user_id, context, |user| {
                Ok(user.modify_address(command.address.clone())?)
            })
        })
        .await
    }
}
