//! API handlers module

pub mod emissions;
pub mod experiments;
pub mod health;
pub mod organizations;
pub mod projects;
pub mod reports;
pub mod runs;
pub mod tokens;
pub mod users;

use axum::http::Uri;
use carbonserver_common::{
    auth::Principal,
    db::models::User,
    errors::{AppError, Result},
};

/// The calling user, for operations that need a user session
pub(crate) fn require_user(principal: &Principal) -> Result<&User> {
    match principal {
        Principal::User(user) => Ok(user),
        Principal::ProjectToken(_) => Err(AppError::forbidden(
            "This operation requires a user session",
        )),
        Principal::Anonymous => Err(AppError::unauthorized("Authentication required")),
    }
}

/// Fallback for paths no route matches
pub async fn route_not_found(uri: Uri) -> AppError {
    AppError::not_found("Route", uri.path())
}
