//! Emission handlers

use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::AppState;
use axum::{extract::State, http::StatusCode, Extension, Json};
use carbonserver_common::{
    auth::{Action, Principal, Resource},
    db::{models::Emission, Page, PageRequest},
    errors::Result,
    schemas::EmissionCreate,
};
use uuid::Uuid;

/// Agent ingestion of one measurement
pub async fn create_emission(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(payload): ApiJson<EmissionCreate>,
) -> Result<(StatusCode, Json<Emission>)> {
    let emission = state.ingestor.create_emission(&principal, payload).await?;
    Ok((StatusCode::CREATED, Json(emission)))
}

pub async fn get_emission(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(emission_id): ApiPath<Uuid>,
) -> Result<Json<Emission>> {
    state
        .access
        .authorize(&principal, Action::Read, Resource::Emission(emission_id))
        .await?;
    let emission = state.repo.get_emission(emission_id).await?;
    Ok(Json(emission))
}

/// One page of a run's emissions
pub async fn list_emissions(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(run_id): ApiPath<Uuid>,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> Result<Json<Page<Emission>>> {
    state
        .access
        .authorize(&principal, Action::Read, Resource::Run(run_id))
        .await?;
    let emissions = state.repo.list_emissions_from_run(run_id, page).await?;
    Ok(Json(emissions))
}
