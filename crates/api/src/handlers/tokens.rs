//! Project token handlers

use crate::extract::{ApiJson, ApiPath};
use crate::AppState;
use axum::{extract::State, http::StatusCode, Extension, Json};
use carbonserver_common::{
    auth::{Action, IssuedToken, Principal, Resource},
    db::models::ProjectToken,
    errors::Result,
    schemas::ProjectTokenCreate,
};
use uuid::Uuid;

/// Issue a token; the response is the only place the raw value appears
pub async fn create_token(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(project_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<ProjectTokenCreate>,
) -> Result<(StatusCode, Json<IssuedToken>)> {
    state
        .access
        .authorize(&principal, Action::Administer, Resource::Project(project_id))
        .await?;
    let issued = state.tokens.issue(project_id, payload).await?;
    Ok((StatusCode::CREATED, Json(issued)))
}

pub async fn list_tokens(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(project_id): ApiPath<Uuid>,
) -> Result<Json<Vec<ProjectToken>>> {
    state
        .access
        .authorize(&principal, Action::Administer, Resource::Project(project_id))
        .await?;
    let tokens = state.tokens.list(project_id).await?;
    Ok(Json(tokens))
}

/// Revoke a token, keeping the row for audit
pub async fn revoke_token(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath((project_id, token_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<Json<ProjectToken>> {
    state
        .access
        .authorize(&principal, Action::Administer, Resource::Project(project_id))
        .await?;
    let token = state.tokens.revoke(project_id, token_id).await?;
    Ok(Json(token))
}

pub async fn delete_token(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath((project_id, token_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<StatusCode> {
    state
        .access
        .authorize(&principal, Action::Administer, Resource::Project(project_id))
        .await?;
    state.tokens.delete(project_id, token_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
