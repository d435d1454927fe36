//! User handlers

use super::require_user;
use crate::extract::ApiPath;
use crate::AppState;
use axum::{extract::State, Extension, Json};
use carbonserver_common::{
    auth::Principal,
    db::models::User,
    errors::{AppError, Result},
};
use uuid::Uuid;

/// The calling user
pub async fn get_current_user(Extension(principal): Extension<Principal>) -> Result<Json<User>> {
    require_user(&principal).cloned().map(Json)
}

/// A user by id; users may only read themselves
pub async fn get_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> Result<Json<User>> {
    let caller = require_user(&principal)?;
    if caller.id != user_id {
        return Err(AppError::forbidden("Users can only read their own profile"));
    }
    let user = state.repo.get_user(user_id).await?;
    Ok(Json(user))
}
