//! API Routes
//!
//! HTTP endpoint definitions.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::aggregate::{Aggregate, User};
use crate::domain::{Address, OperationContext, UserProfile};
use crate::error::AppError;
use crate::event_store::{StoredEvent, UserStore};
use crate::handlers::{
    AddRolesCommand, AddRolesHandler, AdjustWalletCommand, AdjustWalletHandler,
    CreateUserCommand, CreateUserHandler, DeleteUserCommand, DeleteUserHandler,
    ModifyAddressCommand, ModifyAddressHandler, QueryUserByEmailCommand,
    QueryUserByEmailHandler, RemoveRoleCommand, RemoveRoleHandler, UpdateUserCommand,
    UpdateUserHandler, UserCommandResult, UserQueries,
};
use crate::projection::{ProjectionService, UserDashboardStats};

/// Shared router state
#[derive(Debug, Clone)]
pub struct AppState<S> {
    pub store: S,
    pub projection: ProjectionService,
}

impl<S> AppState<S> {
    pub fn new(store: S, projection: ProjectionService) -> Self {
        Self { store, projection }
    }
}

// =========================================================================
// Request/Response types
// =========================================================================

/// Profile body shared by create and full update
#[derive(Debug, Deserialize)]
pub struct UserProfileRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
    pub address: Address,
}

impl From<UserProfileRequest> for UserProfile {
    fn from(request: UserProfileRequest) -> Self {
        Self {
            name: request.name,
            phone: request.phone,
            email: request.email,
            city: request.city,
            country: request.country,
            address: request.address,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateUserResponse {
    pub user_id: Uuid,
    pub version: i64,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub city: String,
    pub country: String,
    pub address: Address,
    pub roles: BTreeSet<String>,
    pub wallet_balance: Decimal,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id(),
            name: user.name().to_string(),
            phone: user.phone().to_string(),
            email: user.email().to_string(),
            city: user.city().to_string(),
            country: user.country().to_string(),
            address: user.address().clone(),
            roles: user.roles().clone(),
            wallet_balance: user.wallet_balance(),
            version: user.version(),
            created_at: user.created_at(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AddRolesRequest {
    pub roles: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdjustWalletRequest {
    /// Signed amount as a decimal string
    pub amount: String,
}

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub id: Uuid,
    pub version: i64,
    pub event_type: String,
    pub data: crate::domain::UserEvent,
    pub context: OperationContext,
    pub recorded_at: DateTime<Utc>,
}

impl From<StoredEvent> for EventResponse {
    fn from(stored: StoredEvent) -> Self {
        Self {
            id: stored.id,
            version: stored.version,
            event_type: stored.event_type,
            data: stored.event,
            context: stored.context,
            recorded_at: stored.recorded_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EventStreamResponse {
    pub stream_id: Uuid,
    pub events: Vec<EventResponse>,
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router<S>() -> Router<AppState<S>>
where
    S: UserStore + Clone + 'static,
{
    Router::new()
        // User documents and commands
        .route("/users", post(create_user::<S>))
        .route(
            "/users/:user_id",
            get(get_user::<S>).put(update_user::<S>).delete(delete_user::<S>),
        )
        .route("/users/:user_id/address", put(modify_address::<S>))
        .route("/users/:user_id/roles", post(add_roles::<S>))
        .route("/users/:user_id/roles/:role", delete(remove_role::<S>))
        .route("/users/:user_id/wallet/adjustments", post(adjust_wallet::<S>))
        .route("/users/by-email/:email", get(get_user_by_email::<S>))
        // Event streams and projections
        .route("/events/:user_id", get(fetch_stream::<S>))
        .route("/events/:user_id/dashboard", get(get_dashboard::<S>))
        .route("/events/:user_id/dashboard/rebuild", post(rebuild_dashboard::<S>))
}

// =========================================================================
// POST /users
// =========================================================================

/// Create a new user
async fn create_user<S: UserStore>(
    State(state): State<AppState<S>>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<UserProfileRequest>,
) -> Result<(StatusCode, Json<CreateUserResponse>), AppError> {
    let handler = CreateUserHandler::new(&state.store, state.projection);
    let command = CreateUserCommand::new(Uuid::new_v4(), request.into());

    let result = handler.execute(command, &context).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateUserResponse {
            user_id: result.user_id,
            version: result.version,
        }),
    ))
}

// =========================================================================
// GET / PUT / DELETE /users/:user_id
// =========================================================================

/// Get user by ID
async fn get_user<S: UserStore>(
    State(state): State<AppState<S>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserResponse>, AppError> {
    let user = UserQueries::new(&state.store, state.projection)
        .get_user(user_id)
        .await?;

    Ok(Json(user.into()))
}

/// Replace every profile field
async fn update_user<S: UserStore>(
    State(state): State<AppState<S>>,
    Extension(context): Extension<OperationContext>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<UserProfileRequest>,
) -> Result<Json<UserCommandResult>, AppError> {
    let result = UpdateUserHandler::new(&state.store, state.projection)
        .execute(UpdateUserCommand::new(user_id, request.into()), &context)
        .await?;

    Ok(Json(result))
}

/// Delete user; the stream and dashboard are kept
async fn delete_user<S: UserStore>(
    State(state): State<AppState<S>>,
    Extension(context): Extension<OperationContext>,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    DeleteUserHandler::new(&state.store, state.projection)
        .execute(DeleteUserCommand::new(user_id), &context)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

// =========================================================================
// Field commands
// =========================================================================

async fn modify_address<S: UserStore>(
    State(state): State<AppState<S>>,
    Extension(context): Extension<OperationContext>,
    Path(user_id): Path<Uuid>,
    Json(address): Json<Address>,
) -> Result<Json<UserCommandResult>, AppError> {
    let result = ModifyAddressHandler::new(&state.store, state.projection)
        .execute(ModifyAddressCommand::new(user_id, address), &context)
        .await?;

    Ok(Json(result))
}

async fn add_roles<S: UserStore>(
    State(state): State<AppState<S>>,
    Extension(context): Extension<OperationContext>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<AddRolesRequest>,
) -> Result<Json<UserCommandResult>, AppError> {
    let result = AddRolesHandler::new(&state.store, state.projection)
        .execute(AddRolesCommand::new(user_id, request.roles), &context)
        .await?;

    Ok(Json(result))
}

async fn remove_role<S: UserStore>(
    State(state): State<AppState<S>>,
    Extension(context): Extension<OperationContext>,
    Path((user_id, role)): Path<(Uuid, String)>,
) -> Result<Json<UserCommandResult>, AppError> {
    let result = RemoveRoleHandler::new(&state.store, state.projection)
        .execute(RemoveRoleCommand::new(user_id, role), &context)
        .await?;

    Ok(Json(result))
}

async fn adjust_wallet<S: UserStore>(
    State(state): State<AppState<S>>,
    Extension(context): Extension<OperationContext>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<AdjustWalletRequest>,
) -> Result<Json<UserCommandResult>, AppError> {
    let result = AdjustWalletHandler::new(&state.store, state.projection)
        .execute(AdjustWalletCommand::new(user_id, request.amount), &context)
        .await?;

    Ok(Json(result))
}

// =========================================================================
// GET /users/by-email/:email
// =========================================================================

/// Look up a user by email; the lookup is recorded on the user's stream
async fn get_user_by_email<S: UserStore>(
    State(state): State<AppState<S>>,
    Extension(context): Extension<OperationContext>,
    Path(email): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let user = QueryUserByEmailHandler::new(&state.store, state.projection)
        .execute(QueryUserByEmailCommand::new(email), &context)
        .await?;

    Ok(Json(user.into()))
}

// =========================================================================
// /events/:user_id
// =========================================================================

/// Full event stream of a user
async fn fetch_stream<S: UserStore>(
    State(state): State<AppState<S>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<EventStreamResponse>, AppError> {
    let events = UserQueries::new(&state.store, state.projection)
        .fetch_stream(user_id)
        .await?;

    Ok(Json(EventStreamResponse {
        stream_id: user_id,
        events: events.into_iter().map(EventResponse::from).collect(),
    }))
}

async fn get_dashboard<S: UserStore>(
    State(state): State<AppState<S>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserDashboardStats>, AppError> {
    let dashboard = UserQueries::new(&state.store, state.projection)
        .get_dashboard(user_id)
        .await?;

    Ok(Json(dashboard))
}

async fn rebuild_dashboard<S: UserStore>(
    State(state): State<AppState<S>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserDashboardStats>, AppError> {
    let dashboard = UserQueries::new(&state.store, state.projection)
        .rebuild_dashboard(user_id)
        .await?;

    Ok(Json(dashboard))
}
