//! User dashboard view
//!
//! Read model derived by folding a user's event stream. The fold is pure and
//! deterministic: replaying the same ordered events from an empty state
//! always yields the same snapshot, field for field.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::UserEvent;
use crate::event_store::StoredEvent;

use super::ProjectionError;

/// Dashboard snapshot for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDashboardStats {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub total_times_user_email_queried: i64,
    pub user_last_email_query_attempt: Option<DateTime<Utc>>,
    pub total_times_address_modified: i64,
    pub total_times_user_roles_modified: i64,
    pub current_total_wallet_balance: Decimal,
    pub is_deleted: bool,
    /// Stream version of the last folded event
    pub version: i64,
}

impl UserDashboardStats {
    fn created(id: Uuid, name: &str, email: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            email: email.to_string(),
            total_times_user_email_queried: 0,
            user_last_email_query_attempt: None,
            total_times_address_modified: 0,
            total_times_user_roles_modified: 0,
            current_total_wallet_balance: Decimal::ZERO,
            is_deleted: false,
            version: 1,
        }
    }

    /// Fold one event into the snapshot.
    ///
    /// `UserCreated` is the only event that may start from `None`, and it may
    /// not appear twice. After `UserDeleted` the snapshot only advances its
    /// version.
    pub fn fold(current: Option<Self>, event: &UserEvent) -> Result<Self, ProjectionError> {
        let Some(mut view) = current else {
            return match event {
                UserEvent::UserCreated {
                    user_id,
                    name,
                    email,
                    ..
                } => Ok(Self::created(*user_id, name, email)),
                other => Err(ProjectionError::SequenceViolation(format!(
                    "{} folded before UserCreated",
                    other.event_type()
                ))),
            };
        };

        view.version += 1;
        if view.is_deleted {
            return Ok(view);
        }

        match event {
            UserEvent::UserCreated { user_id, .. } => {
                return Err(ProjectionError::SequenceViolation(format!(
                    "stream {} already created, got UserCreated for {}",
                    view.id, user_id
                )));
            }
            UserEvent::UserQueriedByEmail { fetched_at, .. } => {
                view.total_times_user_email_queried += 1;
                view.user_last_email_query_attempt = Some(*fetched_at);
            }
            UserEvent::UserAddressModified { .. } => {
                view.total_times_address_modified += 1;
            }
            UserEvent::UserRolesAdded { .. } | UserEvent::UserRoleRemoved { .. } => {
                view.total_times_user_roles_modified += 1;
            }
            UserEvent::UserWalletBalanceAdjusted { amount } => {
                view.current_total_wallet_balance += *amount;
            }
            UserEvent::UserUpdated { profile } => {
                view.name = profile.name.clone();
                view.email = profile.email.clone();
            }
            UserEvent::UserDeleted => {
                view.is_deleted = true;
            }
            UserEvent::Unrecognized => {}
        }

        Ok(view)
    }

    /// Fold an event known to sit at `version` of stream `stream_id`.
    ///
    /// Only the snapshot's next version may be folded. A version at or below
    /// the snapshot's is a sequence violation; one further ahead is a gap.
    pub fn fold_at(
        current: Option<Self>,
        stream_id: Uuid,
        version: i64,
        event: &UserEvent,
    ) -> Result<Self, ProjectionError> {
        if let Some(view) = &current {
            if view.id != stream_id {
                return Err(ProjectionError::SequenceViolation(format!(
                    "event for stream {stream_id} folded into snapshot of {}",
                    view.id
                )));
            }
            if version <= view.version {
                return Err(ProjectionError::SequenceViolation(format!(
                    "version {version} of stream {stream_id} already folded (snapshot at {})",
                    view.version
                )));
            }
        }

        let expected = current.as_ref().map_or(1, |view| view.version + 1);
        if version != expected {
            return Err(ProjectionError::VersionGap {
                stream_id,
                expected,
                found: version,
            });
        }

        Self::fold(current, event)
    }

    pub fn fold_stored(current: Option<Self>, stored: &StoredEvent) -> Result<Self, ProjectionError> {
        Self::fold_at(current, stored.stream_id, stored.version, &stored.event)
    }

    /// Replay a full stream history from an absent snapshot
    pub fn rebuild(events: &[StoredEvent]) -> Result<Option<Self>, ProjectionError> {
        events
            .iter()
            .try_fold(None, |current, stored| Self::fold_stored(current, stored).map(Some))
    }

    /// Replay bare events in order (versions are implied by position)
    pub fn replay<'a, I>(events: I) -> Result<Option<Self>, ProjectionError>
    where
        I: IntoIterator<Item = &'a UserEvent>,
    {
        events
            .into_iter()
            .try_fold(None, |current, event| Self::fold(current, event).map(Some))
    }
}
