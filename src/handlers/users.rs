use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    models::user::{PermissionSet, User},
    services::users as user_service,
    state::AppState,
    validation::auth::*,
};

/// The request payload for creating a user.
#[derive(Deserialize, Debug)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub permissions: PermissionSet,
}

/// The request payload for replacing a user's permissions.
#[derive(Deserialize, Debug)]
pub struct UpdatePermissionsRequest {
    pub permissions: PermissionSet,
}

/// The response payload describing one user.
#[derive(Serialize)]
pub struct UserResponse {
    pub username: String,
    pub permissions: PermissionSet,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            permissions: user.permissions,
            created_at: user.created_at,
            last_login: user.last_login,
        }
    }
}

/// The response payload for delete operations.
#[derive(Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

/// Lists every user for the admin panel.
#[axum::debug_handler]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserResponse>>> {
    let users = user_service::list_users(&state.db).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Creates a new user.
#[axum::debug_handler]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<Response> {
    tracing::info!("📝 Creating user: {}", payload.username);
    validate_username(&payload.username)?;
    validate_password(&payload.password)?;
    validate_permissions(&payload.permissions)?;

    let user = user_service::create_user(
        &state.db,
        &payload.username,
        &payload.password,
        payload.permissions,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))).into_response())
}

/// Replaces a user's permission set.
#[axum::debug_handler]
pub async fn update_permissions(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(payload): Json<UpdatePermissionsRequest>,
) -> Result<Json<UserResponse>> {
    validate_permissions(&payload.permissions)?;

    user_service::update_permissions(&state.db, &username, payload.permissions).await?;

    let user = user_service::get_user(&state.db, &username).await?;
    Ok(Json(UserResponse::from(user)))
}

/// Deletes a user.
#[axum::debug_handler]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<ActionResponse>> {
    user_service::delete_user(&state.db, &username).await?;

    Ok(Json(ActionResponse {
        success: true,
        message: format!("Deleted user {}", username),
    }))
}

/// Reports user and event counters for the admin panel.
#[axum::debug_handler]
pub async fn stats(State(state): State<AppState>) -> Result<Json<user_service::PortalStats>> {
    Ok(Json(user_service::stats(&state.db).await?))
}
