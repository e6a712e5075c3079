//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use thiserror::Error;

/// Business rule violations raised while deciding events on a user.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Malformed or missing input
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The referenced entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
