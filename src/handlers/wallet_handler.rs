//! Wallet Adjustment Handler
//!
//! Credits (positive) and debits (negative) move the balance by the
//! signed amount. Balances may go negative.

use crate::domain::{OperationContext, WalletAdjustment};
use crate::error::AppError;
use crate::event_store::UserStore;
use crate::projection::ProjectionService;

use super::session::{decide_and_commit, with_conflict_retry};
use super::{AdjustWalletCommand, UserCommandResult};

/// Handler for wallet adjustments
pub struct AdjustWalletHandler<'a, S: ?Sized> {
    store: &'a S,
    projection: ProjectionService,
}

impl<'a, S> AdjustWalletHandler<'a, S>
where
    S: UserStore + ?Sized,
{
    pub fn new(store: &'a S, projection: ProjectionService) -> Self {
        Self { store, projection }
    }

    /// Execute the adjust wallet command
    pub async fn execute(
        &self,
        command: AdjustWalletCommand,
        context: &OperationContext,
    ) -> Result<UserCommandResult, AppError> {
        let adjustment: WalletAdjustment = command.amount.parse()?;

        let result = with_conflict_retry(|| {
            decide_and_commit(self.store, self.projection, command.user_id, context, |user| {
                Ok(user.adjust_wallet(adjustment)?)
            })
        })
        .await?;

        tracing::info!(
            user_id = %command.user_id,
            amount = %adjustment,
            debit = adjustment.is_debit(),
            version = result.version,
            "Wallet adjusted"
        );

        Ok(result)
    }
}
