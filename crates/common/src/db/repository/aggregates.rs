use super::{found, Repository};
use crate::aggregation::{
    EmissionTotals, ExperimentReport, OrganizationReport, ProjectReport, ReportWindow, RunReport,
    TotalsRow,
};
use crate::db::models::*;
use crate::errors::{AppError, Result};
use sea_orm::sea_query::{Expr, Func, JoinType, SimpleExpr};
use sea_orm::{
    ColumnTrait, EntityTrait, FromQueryResult, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait, Select,
};
use std::collections::HashMap;
use uuid::Uuid;

fn col(column: EmissionColumn) -> Expr {
    Expr::col((EmissionEntity, column))
}

fn sum(column: EmissionColumn) -> SimpleExpr {
    col(column).sum()
}

fn avg(column: EmissionColumn) -> SimpleExpr {
    Func::avg(col(column)).into()
}

/// Append the report aggregates to an emissions query
fn with_totals(select: Select<EmissionEntity>) -> Select<EmissionEntity> {
    select
        .column_as(sum(EmissionColumn::EmissionsSum), "emissions_sum")
        .column_as(sum(EmissionColumn::EnergyConsumed), "energy_consumed")
        .column_as(sum(EmissionColumn::CpuEnergy), "cpu_energy")
        .column_as(sum(EmissionColumn::GpuEnergy), "gpu_energy")
        .column_as(sum(EmissionColumn::RamEnergy), "ram_energy")
        .column_as(sum(EmissionColumn::Duration), "duration")
        .column_as(avg(EmissionColumn::CpuPower), "cpu_power")
        .column_as(avg(EmissionColumn::GpuPower), "gpu_power")
        .column_as(avg(EmissionColumn::RamPower), "ram_power")
        .column_as(avg(EmissionColumn::EmissionsRate), "emissions_rate")
        .column_as(col(EmissionColumn::Id).count(), "emissions_count")
}

fn in_window(select: Select<EmissionEntity>, window: &ReportWindow) -> Select<EmissionEntity> {
    select.filter(EmissionColumn::Timestamp.between(window.start, window.end))
}

/// Aggregates keyed by the parent they were grouped on
#[derive(Debug, FromQueryResult)]
struct GroupedTotalsRow {
    group_id: Uuid,
    emissions_sum: Option<f64>,
    energy_consumed: Option<f64>,
    cpu_energy: Option<f64>,
    gpu_energy: Option<f64>,
    ram_energy: Option<f64>,
    duration: Option<f64>,
    cpu_power: Option<f64>,
    gpu_power: Option<f64>,
    ram_power: Option<f64>,
    emissions_rate: Option<f64>,
    emissions_count: Option<i64>,
}

impl GroupedTotalsRow {
    fn split(self) -> (Uuid, EmissionTotals) {
        let totals = TotalsRow {
            emissions_sum: self.emissions_sum,
            energy_consumed: self.energy_consumed,
            cpu_energy: self.cpu_energy,
            gpu_energy: self.gpu_energy,
            ram_energy: self.ram_energy,
            duration: self.duration,
            cpu_power: self.cpu_power,
            gpu_power: self.gpu_power,
            ram_power: self.ram_power,
            emissions_rate: self.emissions_rate,
            emissions_count: self.emissions_count,
        };
        (self.group_id, totals.into())
    }
}

impl Repository {
    // ========================================================================
    // Report Operations
    // ========================================================================

    async fn totals(&self, select: Select<EmissionEntity>) -> Result<EmissionTotals> {
        let row = with_totals(select.select_only())
            .into_model::<TotalsRow>()
            .one(self.read_conn())
            .await?;
        Ok(row.unwrap_or_default().into())
    }

    async fn grouped_totals(
        &self,
        select: Select<EmissionEntity>,
        group: SimpleExpr,
    ) -> Result<HashMap<Uuid, EmissionTotals>> {
        let rows = with_totals(select.select_only().column_as(group.clone(), "group_id"))
            .group_by(group)
            .into_model::<GroupedTotalsRow>()
            .all(self.read_conn())
            .await?;
        Ok(rows.into_iter().map(GroupedTotalsRow::split).collect())
    }

    /// Sums for a single run
    pub async fn get_run_detailed_sums(&self, run_id: Uuid, window: &ReportWindow) -> Result<RunReport> {
        let run = self.get_run(run_id).await?;
        let select = EmissionEntity::find().filter(EmissionColumn::RunId.eq(run_id));
        let totals = self.totals(in_window(select, window)).await?;

        Ok(RunReport {
            run_id: run.id,
            experiment_id: run.experiment_id,
            timestamp: run.timestamp,
            totals,
        })
    }

    /// One rollup per run of an experiment; runs with nothing in the window report zeros
    pub async fn get_experiment_detailed_sums_by_run(
        &self,
        experiment_id: Uuid,
        window: &ReportWindow,
    ) -> Result<Vec<RunReport>> {
        self.get_experiment(experiment_id).await?;
        let runs = self.list_runs_from_experiment(experiment_id).await?;

        let select = EmissionEntity::find()
            .join(JoinType::InnerJoin, EmissionRelation::Run.def())
            .filter(RunColumn::ExperimentId.eq(experiment_id));
        let mut by_run = self
            .grouped_totals(
                in_window(select, window),
                Expr::col((EmissionEntity, EmissionColumn::RunId)).into(),
            )
            .await?;

        Ok(runs
            .into_iter()
            .map(|run| RunReport {
                totals: by_run.remove(&run.id).unwrap_or_default(),
                run_id: run.id,
                experiment_id: run.experiment_id,
                timestamp: run.timestamp,
            })
            .collect())
    }

    /// One rollup per experiment of a project
    pub async fn get_project_detailed_sums_by_experiment(
        &self,
        project_id: Uuid,
        window: &ReportWindow,
    ) -> Result<Vec<ExperimentReport>> {
        self.get_project(project_id).await?;
        let experiments = self.list_experiments_from_project(project_id).await?;

        let select = EmissionEntity::find()
            .join(JoinType::InnerJoin, EmissionRelation::Run.def())
            .join(JoinType::InnerJoin, RunRelation::Experiment.def())
            .filter(ExperimentColumn::ProjectId.eq(project_id));
        let mut by_experiment = self
            .grouped_totals(
                in_window(select, window),
                Expr::col((RunEntity, RunColumn::ExperimentId)).into(),
            )
            .await?;

        Ok(experiments
            .into_iter()
            .map(|experiment| ExperimentReport {
                totals: by_experiment.remove(&experiment.id).unwrap_or_default(),
                experiment_id: experiment.id,
                project_id: experiment.project_id,
                timestamp: experiment.timestamp,
                name: experiment.name,
                description: experiment.description,
                country_name: experiment.country_name,
                country_iso_code: experiment.country_iso_code,
                region: experiment.region,
                on_cloud: experiment.on_cloud,
                cloud_provider: experiment.cloud_provider,
                cloud_region: experiment.cloud_region,
            })
            .collect())
    }

    /// Totals across every run of a project
    pub async fn get_project_global_sums(
        &self,
        project_id: Uuid,
        window: &ReportWindow,
    ) -> Result<ProjectReport> {
        let project = self.get_project(project_id).await?;

        let select = EmissionEntity::find()
            .join(JoinType::InnerJoin, EmissionRelation::Run.def())
            .join(JoinType::InnerJoin, RunRelation::Experiment.def())
            .filter(ExperimentColumn::ProjectId.eq(project_id));
        let totals = self.totals(in_window(select, window)).await?;

        Ok(ProjectReport {
            project_id: project.id,
            name: project.name,
            description: project.description,
            start: window.start,
            end: window.end,
            totals,
        })
    }

    /// Totals across every project of an organization
    pub async fn get_organization_global_sums(
        &self,
        organization_id: Uuid,
        window: &ReportWindow,
    ) -> Result<OrganizationReport> {
        let organization = self.get_organization(organization_id).await?;

        let select = EmissionEntity::find()
            .join(JoinType::InnerJoin, EmissionRelation::Run.def())
            .join(JoinType::InnerJoin, RunRelation::Experiment.def())
            .join(JoinType::InnerJoin, ExperimentRelation::Project.def())
            .filter(ProjectColumn::OrganizationId.eq(organization_id));
        let totals = self.totals(in_window(select, window)).await?;

        Ok(OrganizationReport {
            organization_id: organization.id,
            name: organization.name,
            description: organization.description,
            start: window.start,
            end: window.end,
            totals,
        })
    }

    /// The run with the latest timestamp in the window across the project's experiments
    pub async fn get_project_last_run(&self, project_id: Uuid, window: &ReportWindow) -> Result<Run> {
        let run = RunEntity::find()
            .join(JoinType::InnerJoin, RunRelation::Experiment.def())
            .filter(ExperimentColumn::ProjectId.eq(project_id))
            .filter(RunColumn::Timestamp.between(window.start, window.end))
            .order_by_desc(RunColumn::Timestamp)
            .one(self.read_conn())
            .await?;

        match run {
            Some(run) => Ok(run),
            None => {
                found(
                    ProjectEntity::find_by_id(project_id).one(self.read_conn()).await?,
                    "Project",
                    project_id,
                )?;
                Err(AppError::NotFound {
                    resource_type: "Run".to_string(),
                    id: format!("in project {} between {} and {}", project_id, window.start, window.end),
                })
            }
        }
    }
}
