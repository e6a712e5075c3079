//! User Dashboard Library
//!
//! Re-exports modules for integration testing and external use.

pub mod aggregate;
pub mod api;
pub mod domain;
pub mod event_store;
pub mod handlers;
pub mod jobs;
pub mod projection;

pub mod config;
pub mod db;
mod error;

pub use config::Config;
pub use domain::{Address, DomainError, OperationContext, UserEvent, UserProfile};
pub use domain::{AdjustmentError, WalletAdjustment};
pub use error::{AppError, AppResult, ErrorResponse};
