//! Wallet adjustment type
//!
//! Domain primitive for signed wallet balance adjustments.
//! Validated at construction so an invalid adjustment never reaches an event.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum magnitude of a single adjustment (1 trillion)
const MAX_MAGNITUDE: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

/// Maximum decimal places (8)
const MAX_SCALE: u32 = 8;

/// A signed, non-zero change to a user's wallet balance.
///
/// # Invariants
/// - Value is never zero
/// - Maximum 8 decimal places
/// - Magnitude is at most 1 trillion
///
/// # Example
/// ```
/// use rust_decimal::Decimal;
/// use user_dashboard::domain::WalletAdjustment;
///
/// let refund = WalletAdjustment::new(Decimal::new(-2050, 2)).unwrap();
/// assert!(refund.is_debit());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletAdjustment(Decimal);

/// Errors that can occur when creating a WalletAdjustment
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdjustmentError {
    #[error("Adjustment must not be zero")]
    Zero,

    #[error("Adjustment has too many decimal places (max {MAX_SCALE}, got {0})")]
    TooManyDecimals(u32),

    #[error("Adjustment exceeds maximum allowed magnitude ({MAX_MAGNITUDE})")]
    Overflow,

    #[error("Invalid adjustment format: {0}")]
    ParseError(String),
}

impl WalletAdjustment {
    /// Create a new adjustment with validation.
    ///
    /// # Errors
    /// - `AdjustmentError::Zero` if value == 0
    /// - `AdjustmentError::TooManyDecimals` if more than 8 decimal places
    /// - `AdjustmentError::Overflow` if |value| > 1 trillion
    pub fn new(value: Decimal) -> Result<Self, AdjustmentError> {
        if value.is_zero() {
            return Err(AdjustmentError::Zero);
        }

        if value.scale() > MAX_SCALE {
            return Err(AdjustmentError::TooManyDecimals(value.scale()));
        }

        if value.abs() > MAX_MAGNITUDE {
            return Err(AdjustmentError::Overflow);
        }

        Ok(Self(value))
    }

    pub fn from_integer(value: i64) -> Result<Self, AdjustmentError> {
        Self::new(Decimal::from(value))
    }

    /// Get the underlying signed value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// True when the adjustment lowers the balance
    pub fn is_debit(&self) -> bool {
        self.0.is_sign_negative()
    }
}

impl fmt::Display for WalletAdjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl FromStr for WalletAdjustment {
    type Err = AdjustmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decimal =
            Decimal::from_str(s.trim()).map_err(|e| AdjustmentError::ParseError(e.to_string()))?;
        WalletAdjustment::new(decimal)
    }
}

impl TryFrom<String> for WalletAdjustment {
    type Error = AdjustmentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        WalletAdjustment::from_str(&value)
    }
}

impl From<WalletAdjustment> for String {
    fn from(adjustment: WalletAdjustment) -> Self {
        adjustment.0.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_max_magnitude_constant() {
        assert_eq!(MAX_MAGNITUDE, dec!(1000000000000));
    }

    #[test]
    fn test_positive_and_negative_adjustments() {
        let credit = WalletAdjustment::new(dec!(50)).unwrap();
        assert!(!credit.is_debit());

        let debit = WalletAdjustment::new(dec!(-20)).unwrap();
        assert!(debit.is_debit());
        assert_eq!(debit.value(), dec!(-20));
    }

    #[test]
    fn test_zero_is_rejected() {
        assert_eq!(WalletAdjustment::new(dec!(0)), Err(AdjustmentError::Zero));
        assert_eq!(WalletAdjustment::new(dec!(0.000)), Err(AdjustmentError::Zero));
    }

    #[test]
    fn test_too_many_decimals() {
        let result = WalletAdjustment::new(dec!(1.123456789));
        assert_eq!(result, Err(AdjustmentError::TooManyDecimals(9)));
    }

    #[test]
    fn test_overflow_in_both_directions() {
        assert_eq!(
            WalletAdjustment::new(dec!(1000000000000.01)),
            Err(AdjustmentError::Overflow)
        );
        assert_eq!(
            WalletAdjustment::new(dec!(-1000000000000.01)),
            Err(AdjustmentError::Overflow)
        );
        assert!(WalletAdjustment::new(dec!(-1000000000000)).is_ok());
    }

    #[test]
    fn test_parse_from_string() {
        let adjustment: WalletAdjustment = " -12.50 ".parse().unwrap();
        assert_eq!(adjustment.value(), dec!(-12.50));

        assert!(matches!(
            "abc".parse::<WalletAdjustment>(),
            Err(AdjustmentError::ParseError(_))
        ));
    }

    #[test]
    fn test_serde_uses_string_form() {
        let adjustment = WalletAdjustment::new(dec!(-7.25)).unwrap();
        let json = serde_json::to_string(&adjustment).unwrap();
        assert_eq!(json, r#""-7.25""#);

        let back: WalletAdjustment = serde_json::from_str(&json).unwrap();
        assert_eq!(back, adjustment);

        assert!(serde_json::from_str::<WalletAdjustment>(r#""0""#).is_err());
    }
}
