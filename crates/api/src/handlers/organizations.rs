//! Organization and membership handlers

use super::require_user;
use crate::extract::{ApiJson, ApiPath};
use crate::AppState;
use axum::{extract::State, http::StatusCode, Extension, Json};
use carbonserver_common::{
    auth::{Action, Principal, Resource},
    db::{models::{Membership, Organization}, Member},
    errors::Result,
    schemas::{MembershipCreate, OrganizationCreate, OrganizationUpdate},
};
use tracing::info;
use uuid::Uuid;

/// Create an organization; the caller becomes its first admin
pub async fn create_organization(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(payload): ApiJson<OrganizationCreate>,
) -> Result<(StatusCode, Json<Organization>)> {
    let user = require_user(&principal)?;
    let organization = state.repo.create_organization(user.id, payload).await?;

    info!(
        organization_id = %organization.id,
        user_id = %user.id,
        "Organization created"
    );
    Ok((StatusCode::CREATED, Json(organization)))
}

/// Organizations the caller belongs to
pub async fn list_organizations(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<Organization>>> {
    let user = require_user(&principal)?;
    let organizations = state.repo.list_organizations_for_user(user.id).await?;
    Ok(Json(organizations))
}

pub async fn get_organization(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(organization_id): ApiPath<Uuid>,
) -> Result<Json<Organization>> {
    state
        .access
        .authorize(&principal, Action::Read, Resource::Organization(organization_id))
        .await?;
    let organization = state.repo.get_organization(organization_id).await?;
    Ok(Json(organization))
}

pub async fn update_organization(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(organization_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<OrganizationUpdate>,
) -> Result<Json<Organization>> {
    state
        .access
        .authorize(&principal, Action::Write, Resource::Organization(organization_id))
        .await?;
    let organization = state.repo.update_organization(organization_id, payload).await?;
    Ok(Json(organization))
}

/// Delete an organization; refused while it still holds projects
pub async fn delete_organization(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(organization_id): ApiPath<Uuid>,
) -> Result<StatusCode> {
    state
        .access
        .authorize(&principal, Action::Administer, Resource::Organization(organization_id))
        .await?;
    state.repo.delete_organization(organization_id).await?;

    info!(organization_id = %organization_id, "Organization deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_members(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(organization_id): ApiPath<Uuid>,
) -> Result<Json<Vec<Member>>> {
    state
        .access
        .authorize(&principal, Action::Read, Resource::Organization(organization_id))
        .await?;
    let members = state.repo.list_organization_members(organization_id).await?;
    Ok(Json(members))
}

/// Add an existing user to the organization
pub async fn add_member(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(organization_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<MembershipCreate>,
) -> Result<(StatusCode, Json<Membership>)> {
    state
        .access
        .authorize(&principal, Action::Administer, Resource::Organization(organization_id))
        .await?;
    let membership = state
        .repo
        .add_organization_member(organization_id, payload.user_id, payload.is_admin)
        .await?;

    info!(
        organization_id = %organization_id,
        user_id = %membership.user_id,
        is_admin = membership.is_admin,
        "Organization member added"
    );
    Ok((StatusCode::CREATED, Json(membership)))
}
