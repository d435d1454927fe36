//! Experiment handlers

use crate::extract::{ApiJson, ApiPath};
use crate::AppState;
use axum::{extract::State, http::StatusCode, Extension, Json};
use carbonserver_common::{
    auth::{Action, Principal, Resource},
    db::models::Experiment,
    errors::Result,
    schemas::ExperimentCreate,
};
use uuid::Uuid;

/// Agent ingestion of an experiment
pub async fn create_experiment(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(payload): ApiJson<ExperimentCreate>,
) -> Result<(StatusCode, Json<Experiment>)> {
    let experiment = state.ingestor.create_experiment(&principal, payload).await?;
    Ok((StatusCode::CREATED, Json(experiment)))
}

pub async fn get_experiment(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(experiment_id): ApiPath<Uuid>,
) -> Result<Json<Experiment>> {
    state
        .access
        .authorize(&principal, Action::Read, Resource::Experiment(experiment_id))
        .await?;
    let experiment = state.repo.get_experiment(experiment_id).await?;
    Ok(Json(experiment))
}

/// Experiments of a project by agent timestamp
pub async fn list_experiments(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(project_id): ApiPath<Uuid>,
) -> Result<Json<Vec<Experiment>>> {
    state
        .access
        .authorize(&principal, Action::Read, Resource::Project(project_id))
        .await?;
    let experiments = state.repo.list_experiments_from_project(project_id).await?;
    Ok(Json(experiments))
}
