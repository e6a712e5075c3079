//! Command Handlers module
//!
//! CQRS command handlers that orchestrate business operations.
//! Each handler validates input, decides an event on the user document and
//! commits the event, the document change and (inline) the folded
//! dashboard snapshot as one unit. Store handles are passed in explicitly.

mod address_handler;
mod commands;
mod delete_user_handler;
mod query_handler;
mod roles_handler;
mod session;
mod update_user_handler;
mod user_handler;
mod wallet_handler;


pub use address_handler::ModifyAddressHandler;
pub use commands::*;
pub use delete_user_handler::DeleteUserHandler;
pub use query_handler::{QueryUserByEmailHandler, UserQueries};
pub use roles_handler::{AddRolesHandler, RemoveRoleHandler};
pub use update_user_handler::UpdateUserHandler;
pub use user_handler::CreateUserHandler;
pub use wallet_handler::AdjustWalletHandler;
