use super::{found, Repository};
use crate::db::models::*;
use crate::errors::Result;
use crate::schemas::RunCreate;
use sea_orm::sea_query::JoinType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait, Set,
};
use uuid::Uuid;

impl Repository {
    // ========================================================================
    // Run Operations
    // ========================================================================

    /// Persist a run under an existing experiment
    pub async fn create_run(&self, payload: RunCreate) -> Result<Run> {
        found(
            ExperimentEntity::find_by_id(payload.experiment_id)
                .one(self.write_conn())
                .await?,
            "Experiment",
            payload.experiment_id,
        )?;

        RunActiveModel {
            id: Set(Uuid::new_v4()),
            experiment_id: Set(payload.experiment_id),
            timestamp: Set(payload.timestamp),
            os: Set(payload.os),
            python_version: Set(payload.python_version),
            codecarbon_version: Set(payload.codecarbon_version),
            cpu_count: Set(payload.cpu_count),
            cpu_model: Set(payload.cpu_model),
            gpu_count: Set(payload.gpu_count),
            gpu_model: Set(payload.gpu_model),
            longitude: Set(payload.longitude),
            latitude: Set(payload.latitude),
            region: Set(payload.region),
            provider: Set(payload.provider),
            ram_total_size: Set(payload.ram_total_size),
            tracking_mode: Set(payload.tracking_mode),
        }
        .insert(self.write_conn())
        .await
        .map_err(Into::into)
    }

    /// Get run by ID
    pub async fn get_run(&self, id: Uuid) -> Result<Run> {
        let row = RunEntity::find_by_id(id).one(self.read_conn()).await?;
        found(row, "Run", id)
    }

    /// Runs of an experiment by agent timestamp
    pub async fn list_runs_from_experiment(&self, experiment_id: Uuid) -> Result<Vec<Run>> {
        RunEntity::find()
            .filter(RunColumn::ExperimentId.eq(experiment_id))
            .order_by_asc(RunColumn::Timestamp)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Project that owns a run, through its experiment
    pub async fn project_id_of_run(&self, id: Uuid) -> Result<Uuid> {
        let row = RunEntity::find_by_id(id)
            .select_only()
            .column(ExperimentColumn::ProjectId)
            .join(JoinType::InnerJoin, RunRelation::Experiment.def())
            .into_tuple::<Uuid>()
            .one(self.read_conn())
            .await?;
        found(row, "Run", id)
    }
}
