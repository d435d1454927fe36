use super::{found, Repository};
use crate::db::models::*;
use crate::errors::Result;
use crate::schemas::ExperimentCreate;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set};
use uuid::Uuid;

impl Repository {
    // ========================================================================
    // Experiment Operations
    // ========================================================================

    /// Persist an experiment under an existing project
    pub async fn create_experiment(&self, payload: ExperimentCreate) -> Result<Experiment> {
        found(
            ProjectEntity::find_by_id(payload.project_id)
                .one(self.write_conn())
                .await?,
            "Project",
            payload.project_id,
        )?;

        ExperimentActiveModel {
            id: Set(Uuid::new_v4()),
            project_id: Set(payload.project_id),
            timestamp: Set(payload.timestamp),
            name: Set(payload.name),
            description: Set(payload.description),
            country_name: Set(payload.country_name),
            country_iso_code: Set(payload.country_iso_code),
            region: Set(payload.region),
            on_cloud: Set(payload.on_cloud),
            cloud_provider: Set(payload.cloud_provider),
            cloud_region: Set(payload.cloud_region),
        }
        .insert(self.write_conn())
        .await
        .map_err(Into::into)
    }

    /// Get experiment by ID
    pub async fn get_experiment(&self, id: Uuid) -> Result<Experiment> {
        let row = ExperimentEntity::find_by_id(id).one(self.read_conn()).await?;
        found(row, "Experiment", id)
    }

    /// Experiments of a project by agent timestamp
    pub async fn list_experiments_from_project(&self, project_id: Uuid) -> Result<Vec<Experiment>> {
        ExperimentEntity::find()
            .filter(ExperimentColumn::ProjectId.eq(project_id))
            .order_by_asc(ExperimentColumn::Timestamp)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Project that owns an experiment
    pub async fn project_id_of_experiment(&self, id: Uuid) -> Result<Uuid> {
        let row = ExperimentEntity::find_by_id(id)
            .select_only()
            .column(ExperimentColumn::ProjectId)
            .into_tuple::<Uuid>()
            .one(self.read_conn())
            .await?;
        found(row, "Experiment", id)
    }
}
