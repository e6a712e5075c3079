//! Domain Events
//!
//! Event definitions for Event Sourcing.
//! Events are immutable facts that have happened to a user aggregate.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use super::{Address, DomainError};

/// User-related events
///
/// Only `UserCreated` carries the user id; every other event is keyed by
/// the stream it is appended to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UserEvent {
    /// User was created; always the first event of a stream
    UserCreated {
        user_id: Uuid,
        name: String,
        email: String,
        created_at: DateTime<Utc>,
    },

    /// User was looked up by email address
    UserQueriedByEmail {
        email: String,
        fetched_at: DateTime<Utc>,
    },

    /// Address was replaced
    UserAddressModified { address: Address },

    /// Role set was assigned
    UserRolesAdded { roles: BTreeSet<String> },

    /// A single role was revoked
    UserRoleRemoved { role: String },

    /// Wallet balance moved by a signed amount
    UserWalletBalanceAdjusted { amount: Decimal },

    /// Profile fields were overwritten wholesale
    UserUpdated { profile: UserProfile },

    /// User was deleted
    UserDeleted,

    /// Event kind written by a newer version of the service
    #[serde(other)]
    Unrecognized,
}

/// Full replacement record for a user's profile fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub city: String,
    pub country: String,
    pub address: Address,
}

impl UserProfile {
    /// Check required fields; phone, city and country are free text
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name is required"));
        }
        validate_email(&self.email)?;
        self.address.validate()
    }
}

/// Minimal shape check: one `@` with text on both sides and no whitespace
pub fn validate_email(email: &str) -> Result<(), DomainError> {
    let well_formed = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if well_formed {
        Ok(())
    } else {
        Err(DomainError::Validation(format!("invalid email address '{email}'")))
    }
}

impl UserEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            UserEvent::UserCreated { .. } => "UserCreated",
            UserEvent::UserQueriedByEmail { .. } => "UserQueriedByEmail",
            UserEvent::UserAddressModified { .. } => "UserAddressModified",
            UserEvent::UserRolesAdded { .. } => "UserRolesAdded",
            UserEvent::UserRoleRemoved { .. } => "UserRoleRemoved",
            UserEvent::UserWalletBalanceAdjusted { .. } => "UserWalletBalanceAdjusted",
            UserEvent::UserUpdated { .. } => "UserUpdated",
            UserEvent::UserDeleted => "UserDeleted",
            UserEvent::Unrecognized => "Unrecognized",
        }
    }

    /// Whether this event starts a stream
    pub fn is_creation(&self) -> bool {
        matches!(self, UserEvent::UserCreated { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_user_event_serialization() {
        let event = UserEvent::UserWalletBalanceAdjusted { amount: dec!(-20.5) };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("UserWalletBalanceAdjusted"));

        let deserialized: UserEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, deserialized);
    }

    #[test]
    fn test_deleted_event_has_only_tag() {
        let json = serde_json::to_value(&UserEvent::UserDeleted).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "UserDeleted" }));
    }

    #[test]
    fn test_unknown_event_type_is_unrecognized() {
        let json = r#"{"type":"UserPasswordChanged","password_changed_at":"2026-01-01T00:00:00Z"}"#;
        let event: UserEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event, UserEvent::Unrecognized);
        assert_eq!(event.event_type(), "Unrecognized");
    }

    #[test]
    fn test_email_shape() {
        assert!(validate_email("ann@x.com").is_ok());
        assert!(validate_email("ann").is_err());
        assert!(validate_email("@x.com").is_err());
        assert!(validate_email("ann@").is_err());
        assert!(validate_email("a b@x.com").is_err());
        assert!(validate_email("a@b@x.com").is_err());
    }

    #[test]
    fn test_profile_requires_name() {
        let profile = UserProfile {
            name: " ".to_string(),
            email: "ann@x.com".to_string(),
            address: Address::new("1 Main Street", "12345"),
            ..Default::default()
        };
        assert!(matches!(profile.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_only_created_starts_a_stream() {
        let created = UserEvent::UserCreated {
            user_id: Uuid::new_v4(),
            name: "Ann".to_string(),
            email: "ann@x.com".to_string(),
            created_at: Utc::now(),
        };
        assert!(created.is_creation());
        assert!(!UserEvent::UserDeleted.is_creation());
    }
}
