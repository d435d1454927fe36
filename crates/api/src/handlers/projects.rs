//! Project handlers

use crate::extract::{ApiJson, ApiPath};
use crate::AppState;
use axum::{extract::State, http::StatusCode, Extension, Json};
use carbonserver_common::{
    auth::{Action, Principal, Resource},
    db::models::Project,
    errors::Result,
    schemas::{ProjectCreate, ProjectUpdate},
};
use tracing::info;
use uuid::Uuid;

/// Create a project inside an organization (organization admins only)
pub async fn create_project(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(organization_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<ProjectCreate>,
) -> Result<(StatusCode, Json<Project>)> {
    state
        .access
        .authorize(&principal, Action::Write, Resource::Organization(organization_id))
        .await?;
    let project = state.repo.create_project(organization_id, payload).await?;

    info!(
        project_id = %project.id,
        organization_id = %organization_id,
        public = project.public,
        "Project created"
    );
    Ok((StatusCode::CREATED, Json(project)))
}

/// Projects of an organization, oldest first
pub async fn list_projects(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(organization_id): ApiPath<Uuid>,
) -> Result<Json<Vec<Project>>> {
    state
        .access
        .authorize(&principal, Action::Read, Resource::Organization(organization_id))
        .await?;
    let projects = state.repo.list_projects_from_organization(organization_id).await?;
    Ok(Json(projects))
}

pub async fn get_project(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(project_id): ApiPath<Uuid>,
) -> Result<Json<Project>> {
    state
        .access
        .authorize(&principal, Action::Read, Resource::Project(project_id))
        .await?;
    let project = state.repo.get_project(project_id).await?;
    Ok(Json(project))
}

pub async fn update_project(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(project_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<ProjectUpdate>,
) -> Result<Json<Project>> {
    state
        .access
        .authorize(&principal, Action::Administer, Resource::Project(project_id))
        .await?;
    let project = state.repo.update_project(project_id, payload).await?;
    Ok(Json(project))
}

/// Delete a project with its experiments, runs, emissions and tokens
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(project_id): ApiPath<Uuid>,
) -> Result<StatusCode> {
    state
        .access
        .authorize(&principal, Action::Administer, Resource::Project(project_id))
        .await?;
    state.repo.delete_project(project_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
