//! Run handlers

use crate::extract::{ApiJson, ApiPath};
use crate::AppState;
use axum::{extract::State, http::StatusCode, Extension, Json};
use carbonserver_common::{
    auth::{Action, Principal, Resource},
    db::models::Run,
    errors::Result,
    schemas::RunCreate,
};
use uuid::Uuid;

/// Agent ingestion of a run
pub async fn create_run(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(payload): ApiJson<RunCreate>,
) -> Result<(StatusCode, Json<Run>)> {
    let run = state.ingestor.create_run(&principal, payload).await?;
    Ok((StatusCode::CREATED, Json(run)))
}

pub async fn get_run(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(run_id): ApiPath<Uuid>,
) -> Result<Json<Run>> {
    state
        .access
        .authorize(&principal, Action::Read, Resource::Run(run_id))
        .await?;
    let run = state.repo.get_run(run_id).await?;
    Ok(Json(run))
}

/// Runs of an experiment by agent timestamp
pub async fn list_runs(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(experiment_id): ApiPath<Uuid>,
) -> Result<Json<Vec<Run>>> {
    state
        .access
        .authorize(&principal, Action::Read, Resource::Experiment(experiment_id))
        .await?;
    let runs = state.repo.list_runs_from_experiment(experiment_id).await?;
    Ok(Json(runs))
}
