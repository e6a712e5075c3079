//! Command definitions
//!
//! Commands represent intentions to change the system state.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Address, UserProfile};

// =========================================================================
// CreateUserCommand
// =========================================================================

/// Command to create a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserCommand {
    pub user_id: Uuid,
    pub profile: UserProfile,
}

impl CreateUserCommand {
    pub fn new(user_id: Uuid, profile: UserProfile) -> Self {
        Self { user_id, profile }
    }
}

// =========================================================================
// Profile commands
// =========================================================================

/// Command to overwrite every profile field of a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateUserCommand {
    pub user_id: Uuid,
    pub profile: UserProfile,
}

impl UpdateUserCommand {
    pub fn new(user_id: Uuid, profile: UserProfile) -> Self {
        Self { user_id, profile }
    }
}

/// Command to replace a user's address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifyAddressCommand {
    pub user_id: Uuid,
    pub address: Address,
}

impl ModifyAddressCommand {
    pub fn new(user_id: Uuid, address: Address) -> Self {
        Self { user_id, address }
    }
}

// =========================================================================
// Role commands
// =========================================================================

/// Command to assign a role set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddRolesCommand {
    pub user_id: Uuid,
    pub roles: Vec<String>,
}

impl AddRolesCommand {
    pub fn new<I, R>(user_id: Uuid, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self {
            user_id,
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }
}

/// Command to revoke a single role
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveRoleCommand {
    pub user_id: Uuid,
    pub role: String,
}

impl RemoveRoleCommand {
    pub fn new(user_id: Uuid, role: impl Into<String>) -> Self {
        Self {
            user_id,
            role: role.into(),
        }
    }
}

// =========================================================================
// AdjustWalletCommand
// =========================================================================

/// Command to move a user's wallet balance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustWalletCommand {
    pub user_id: Uuid,
    /// Signed amount (as string for precise decimal)
    pub amount: String,
}

impl AdjustWalletCommand {
    pub fn new(user_id: Uuid, amount: impl Into<String>) -> Self {
        Self {
            user_id,
            amount: amount.into(),
        }
    }
}

// =========================================================================
// Delete / query commands
// =========================================================================

/// Command to delete a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteUserCommand {
    pub user_id: Uuid,
}

impl DeleteUserCommand {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

/// Look a user up by email. Recorded as an event on the found user's stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryUserByEmailCommand {
    pub email: String,
}

impl QueryUserByEmailCommand {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
        }
    }
}

// =========================================================================
// Results
// =========================================================================

/// Result of a successful user creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserResult {
    pub user_id: Uuid,
    pub version: i64,
}

/// Result of any other accepted command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCommandResult {
    pub user_id: Uuid,
    /// Stream version after the command's event
    pub version: i64,
    pub event_type: String,
}
