//! Time-window report handlers
//!
//! Every report takes optional `start`/`end` query parameters; missing bounds
//! default to the Unix epoch and the current time.

use crate::extract::{ApiPath, ApiQuery};
use crate::AppState;
use axum::{extract::State, Extension, Json};
use carbonserver_common::{
    aggregation::{
        ExperimentReport, OrganizationReport, ProjectReport, ReportWindow, RunReport, WindowQuery,
    },
    auth::{Action, Principal, Resource},
    db::models::Run,
    errors::Result,
    metrics::ReportTimer,
};
use uuid::Uuid;

fn window(state: &AppState, query: WindowQuery) -> Result<ReportWindow> {
    query.into_window(state.clock.now())
}

pub async fn run_sums(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(run_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<WindowQuery>,
) -> Result<Json<RunReport>> {
    let window = window(&state, query)?;
    state
        .access
        .authorize(&principal, Action::Read, Resource::Run(run_id))
        .await?;

    let timer = ReportTimer::start("run_sums");
    let report = state.repo.get_run_detailed_sums(run_id, &window).await?;
    timer.finish();
    Ok(Json(report))
}

pub async fn experiment_sums_by_run(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(experiment_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<WindowQuery>,
) -> Result<Json<Vec<RunReport>>> {
    let window = window(&state, query)?;
    state
        .access
        .authorize(&principal, Action::Read, Resource::Experiment(experiment_id))
        .await?;

    let timer = ReportTimer::start("experiment_sums_by_run");
    let reports = state
        .repo
        .get_experiment_detailed_sums_by_run(experiment_id, &window)
        .await?;
    timer.finish();
    Ok(Json(reports))
}

pub async fn project_sums_by_experiment(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(project_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<WindowQuery>,
) -> Result<Json<Vec<ExperimentReport>>> {
    let window = window(&state, query)?;
    state
        .access
        .authorize(&principal, Action::Read, Resource::Project(project_id))
        .await?;

    let timer = ReportTimer::start("project_sums_by_experiment");
    let reports = state
        .repo
        .get_project_detailed_sums_by_experiment(project_id, &window)
        .await?;
    timer.finish();
    Ok(Json(reports))
}

pub async fn project_sums(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(project_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<WindowQuery>,
) -> Result<Json<ProjectReport>> {
    let window = window(&state, query)?;
    state
        .access
        .authorize(&principal, Action::Read, Resource::Project(project_id))
        .await?;

    let timer = ReportTimer::start("project_sums");
    let report = state.repo.get_project_global_sums(project_id, &window).await?;
    timer.finish();
    Ok(Json(report))
}

pub async fn organization_sums(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(organization_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<WindowQuery>,
) -> Result<Json<OrganizationReport>> {
    let window = window(&state, query)?;
    state
        .access
        .authorize(&principal, Action::Read, Resource::Organization(organization_id))
        .await?;

    let timer = ReportTimer::start("organization_sums");
    let report = state
        .repo
        .get_organization_global_sums(organization_id, &window)
        .await?;
    timer.finish();
    Ok(Json(report))
}

/// Latest run of the project inside the window
pub async fn project_last_run(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(project_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<WindowQuery>,
) -> Result<Json<Run>> {
    let window = window(&state, query)?;
    state
        .access
        .authorize(&principal, Action::Read, Resource::Project(project_id))
        .await?;

    let run = state.repo.get_project_last_run(project_id, &window).await?;
    Ok(Json(run))
}
