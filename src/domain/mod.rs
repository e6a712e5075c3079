//! Domain module
//!
//! Core domain types and business logic.

pub mod address;
pub mod context;
pub mod error;
pub mod events;
pub mod wallet;

pub use address::Address;
pub use context::OperationContext;
pub use error::DomainError;
pub use events::{validate_email, UserEvent, UserProfile};
pub use wallet::{AdjustmentError, WalletAdjustment};
