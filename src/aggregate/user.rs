//! User Aggregate
//!
//! The primary user document. Decision methods validate a command against
//! the current document and return the event to append; `apply` moves the
//! document forward once the event is accepted.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::domain::{Address, DomainError, UserEvent, UserProfile, WalletAdjustment};

use super::Aggregate;

/// Maximum length of a role name
const MAX_ROLE_LEN: usize = 64;

/// User status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserStatus {
    #[default]
    Active,
    Deleted,
}

/// Document fields that can be used in field queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserField {
    Name,
    Email,
    Phone,
    City,
    Country,
}

impl UserField {
    /// Key of the field inside the serialized document
    pub fn json_key(&self) -> &'static str {
        match self {
            UserField::Name => "name",
            UserField::Email => "email",
            UserField::Phone => "phone",
            UserField::City => "city",
            UserField::Country => "country",
        }
    }
}

/// User Aggregate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    id: Uuid,
    name: String,
    phone: String,
    email: String,
    city: String,
    country: String,
    address: Address,
    roles: BTreeSet<String>,
    wallet_balance: Decimal,
    status: UserStatus,
    /// Stream version this document reflects
    version: i64,
    created_at: DateTime<Utc>,
}

impl User {
    /// Create a new user and generate the creation event
    pub fn create(user_id: Uuid, profile: UserProfile, now: DateTime<Utc>) -> (Self, UserEvent) {
        let event = UserEvent::UserCreated {
            user_id,
            name: profile.name.clone(),
            email: profile.email.clone(),
            created_at: now,
        };

        let user = Self {
            id: user_id,
            name: profile.name,
            phone: profile.phone,
            email: profile.email,
            city: profile.city,
            country: profile.country,
            address: profile.address,
            roles: BTreeSet::new(),
            wallet_balance: Decimal::ZERO,
            status: UserStatus::Active,
            version: 1,
            created_at: now,
        };

        (user, event)
    }

    /// Record a lookup of this user by email
    pub fn record_email_query(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<UserEvent, DomainError> {
        self.ensure_active()?;

        Ok(UserEvent::UserQueriedByEmail {
            email: email.to_string(),
            fetched_at: now,
        })
    }

    /// Replace the whole profile
    pub fn update(&self, profile: UserProfile) -> Result<UserEvent, DomainError> {
        self.ensure_active()?;
        profile.validate()?;

        Ok(UserEvent::UserUpdated { profile })
    }

    pub fn modify_address(&self, address: Address) -> Result<UserEvent, DomainError> {
        self.ensure_active()?;
        address.validate()?;

        Ok(UserEvent::UserAddressModified { address })
    }

    /// Assign a role set. The document's roles are replaced by `roles`.
    pub fn add_roles<I>(&self, roles: I) -> Result<UserEvent, DomainError>
    where
        I: IntoIterator<Item = String>,
    {
        self.ensure_active()?;

        let mut normalized = BTreeSet::new();
        for role in roles {
            let role = role.trim();
            if role.is_empty() {
                return Err(DomainError::validation("role names must not be blank"));
            }
            if role.chars().count() > MAX_ROLE_LEN {
                return Err(DomainError::Validation(format!(
                    "role names are limited to {MAX_ROLE_LEN} characters"
                )));
            }
            normalized.insert(role.to_string());
        }

        if normalized.is_empty() {
            return Err(DomainError::validation("at least one role is required"));
        }

        Ok(UserEvent::UserRolesAdded { roles: normalized })
    }

    pub fn remove_role(&self, role: &str) -> Result<UserEvent, DomainError> {
        self.ensure_active()?;

        let role = role.trim();
        if !self.roles.contains(role) {
            return Err(DomainError::NotFound(format!(
                "role '{role}' is not assigned to user {}",
                self.id
            )));
        }

        Ok(UserEvent::UserRoleRemoved {
            role: role.to_string(),
        })
    }

    pub fn adjust_wallet(&self, adjustment: WalletAdjustment) -> Result<UserEvent, DomainError> {
        self.ensure_active()?;

        Ok(UserEvent::UserWalletBalanceAdjusted {
            amount: adjustment.value(),
        })
    }

    pub fn delete(&self) -> Result<UserEvent, DomainError> {
        self.ensure_active()?;
        Ok(UserEvent::UserDeleted)
    }

    fn ensure_active(&self) -> Result<(), DomainError> {
        match self.status {
            UserStatus::Active => Ok(()),
            UserStatus::Deleted => Err(DomainError::NotFound(format!("user {}", self.id))),
        }
    }

    // =========================================================================
    // Getters
    // =========================================================================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    pub fn wallet_balance(&self) -> Decimal {
        self.wallet_balance
    }

    pub fn status(&self) -> UserStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn field_value(&self, field: UserField) -> &str {
        match field {
            UserField::Name => &self.name,
            UserField::Email => &self.email,
            UserField::Phone => &self.phone,
            UserField::City => &self.city,
            UserField::Country => &self.country,
        }
    }

    /// Case-insensitive email comparison, matching the store's unique index
    pub fn has_email(&self, email: &str) -> bool {
        self.email.to_lowercase() == email.to_lowercase()
    }
}

impl Aggregate for User {
    type Event = UserEvent;

    fn aggregate_type() -> &'static str {
        "User"
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(mut self, event: &Self::Event) -> Self {
        match event {
            UserEvent::UserCreated {
                user_id,
                name,
                email,
                created_at,
            } => {
                self.id = *user_id;
                self.name = name.clone();
                self.email = email.clone();
                self.status = UserStatus::Active;
                self.created_at = *created_at;
            }

            UserEvent::UserQueriedByEmail { .. } => {}

            UserEvent::UserAddressModified { address } => {
                self.address = address.clone();
            }

            UserEvent::UserRolesAdded { roles } => {
                self.roles = roles.clone();
            }

            UserEvent::UserRoleRemoved { role } => {
                self.roles.remove(role);
            }

            UserEvent::UserWalletBalanceAdjusted { amount } => {
                self.wallet_balance += *amount;
            }

            UserEvent::UserUpdated { profile } => {
                self.name = profile.name.clone();
                self.phone = profile.phone.clone();
                self.email = profile.email.clone();
                self.city = profile.city.clone();
                self.country = profile.country.clone();
                self.address = profile.address.clone();
            }

            UserEvent::UserDeleted => {
                self.status = UserStatus::Deleted;
            }

            UserEvent::Unrecognized => {}
        }

        self.version += 1;
        self
    }
}
