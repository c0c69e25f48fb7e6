//! User management handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};

use super::parse_param;
use crate::{get_user_email, AppError, AppState, RequireAdmin, SuccessResponse};
use energyreader_core::analytics::user_stats;
use energyreader_core::models::{User, UserFilter, UserRole, UserStats};

/// Query parameters for listing users
#[derive(Debug, Deserialize)]
pub struct UserQuery {
    /// Case-insensitive search on name or email
    pub search: Option<String>,
    /// Filter by role (user, admin)
    pub role: Option<String>,
}

/// Request body for creating a user
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: UserRole,
}

/// Request body for changing a role
#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: UserRole,
}

#[derive(Serialize)]
pub struct CreateUserResponse {
    pub id: i64,
    pub user: User,
}

/// GET /api/users - List users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    headers: HeaderMap,
    Query(params): Query<UserQuery>,
) -> Result<Json<Vec<User>>, AppError> {
    let user_email = get_user_email(&headers);

    let filter = UserFilter {
        search: params.search.clone(),
        role: parse_param(params.role.as_deref(), "role")?,
    };
    let users = state.db.list_users(&filter)?;

    state.db.log_audit(
        &user_email,
        "list",
        Some("user"),
        None,
        Some(&format!(
            "search={:?}, role={:?}, count={}",
            params.search,
            params.role,
            users.len()
        )),
    )?;

    Ok(Json(users))
}

/// POST /api/users - Create a user (returns the existing one for a known email)
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    headers: HeaderMap,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<CreateUserResponse>, AppError> {
    let user_email = get_user_email(&headers);

    let id = state
        .db
        .create_user(&req.email, &req.name, req.role)
        .map_err(AppError::from_core)?;
    let user = state
        .db
        .get_user(id)?
        .ok_or_else(|| AppError::internal("User vanished after creation"))?;

    state.db.log_audit(
        &user_email,
        "create",
        Some("user"),
        Some(id),
        Some(&format!("role={}", user.role)),
    )?;

    Ok(Json(CreateUserResponse { id, user }))
}

/// GET /api/users/stats - Counts for the user management view
pub async fn get_user_stats(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    headers: HeaderMap,
) -> Result<Json<UserStats>, AppError> {
    let user_email = get_user_email(&headers);

    let users = state.db.list_users(&UserFilter::default())?;
    let stats = user_stats(&users, chrono::Utc::now());

    state
        .db
        .log_audit(&user_email, "view", Some("user_stats"), None, None)?;

    Ok(Json(stats))
}

/// GET /api/users/:id - Get one user
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<User>, AppError> {
    let user_email = get_user_email(&headers);

    let user = state
        .db
        .get_user(id)?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    state
        .db
        .log_audit(&user_email, "view", Some("user"), Some(id), None)?;

    Ok(Json(user))
}

/// PUT /api/users/:id/role - Change a user's role
pub async fn update_user_role(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<UpdateRoleRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    let user_email = get_user_email(&headers);

    if !state.db.update_user_role(id, req.role)? {
        return Err(AppError::not_found("User not found"));
    }

    state.db.log_audit(
        &user_email,
        "update_role",
        Some("user"),
        Some(id),
        Some(&format!("role={}", req.role)),
    )?;

    Ok(Json(SuccessResponse { success: true }))
}

/// DELETE /api/users/:id - Delete a user with their bills and feedback
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    let user_email = get_user_email(&headers);

    if !state.db.delete_user(id)? {
        return Err(AppError::not_found("User not found"));
    }

    state
        .db
        .log_audit(&user_email, "delete", Some("user"), Some(id), None)?;

    Ok(Json(SuccessResponse { success: true }))
}
