//! User account endpoints.

use super::parse_id;
use crate::auth::{AuthUser, RequireAdmin};
use crate::server::state::AppState;
use crate::types::{UserId, UserProfile};
use axum::{
    Json,
    extract::{Path, State},
};
use boothbook_web::{AppError, WebResult};

/// Every account, without credentials.
///
/// # Errors
///
/// Returns 500 if accounts cannot be loaded.
pub async fn list_users(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> WebResult<Json<Vec<UserProfile>>> {
    let mut users = state.repositories.users.list().await?;
    users.sort_by(|a, b| a.registration_date.cmp(&b.registration_date));
    Ok(Json(users.iter().map(UserProfile::from).collect()))
}

/// One account, visible to itself and to administrators.
///
/// # Errors
///
/// - 403 for anyone else
/// - 404 "User not found"
pub async fn get_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> WebResult<Json<UserProfile>> {
    let user_id: UserId = parse_id(&id, "User")?;
    user.ensure_owner_or_admin(user_id, "Not authorized to view this user")?;

    let account = state
        .repositories
        .users
        .get(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;
    Ok(Json(UserProfile::from(&account)))
}
