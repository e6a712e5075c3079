//! Postal address value object.

use serde::{Deserialize, Serialize};

use super::DomainError;

/// Maximum length of any single address line
const MAX_LINE_LEN: usize = 200;

/// A user's postal address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub address_line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    pub zip: String,
}

impl Address {
    pub fn new(address_line1: impl Into<String>, zip: impl Into<String>) -> Self {
        Self {
            address_line1: address_line1.into(),
            address_line2: None,
            zip: zip.into(),
        }
    }

    pub fn with_line2(mut self, line2: impl Into<String>) -> Self {
        self.address_line2 = Some(line2.into());
        self
    }

    /// Check required fields and length limits
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.address_line1.trim().is_empty() {
            return Err(DomainError::validation("address_line1 is required"));
        }
        if self.zip.trim().is_empty() {
            return Err(DomainError::validation("zip is required"));
        }

        let too_long = [Some(&self.address_line1), self.address_line2.as_ref()]
            .into_iter()
            .flatten()
            .any(|line| line.chars().count() > MAX_LINE_LEN);
        if too_long {
            return Err(DomainError::validation(format!(
                "address lines are limited to {MAX_LINE_LEN} characters"
            )));
        }

        Ok(())
    }
}
