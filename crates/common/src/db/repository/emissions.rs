use super::{found, Page, PageRequest, Repository};
use crate::db::models::*;
use crate::errors::Result;
use crate::schemas::EmissionCreate;
use sea_orm::sea_query::JoinType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, RelationTrait, Set,
};
use uuid::Uuid;
use validator::Validate;

impl Repository {
    // ========================================================================
    // Emission Operations
    // ========================================================================

    /// Persist one measurement.
    ///
    /// Fails with `Validation` when a numeric bound is violated and with
    /// `NotFound` when the run does not exist; nothing is written in either case.
    pub async fn create_emission(&self, payload: EmissionCreate) -> Result<Emission> {
        payload.validate()?;
        found(
            RunEntity::find_by_id(payload.run_id)
                .one(self.write_conn())
                .await?,
            "Run",
            payload.run_id,
        )?;

        EmissionActiveModel {
            id: Set(Uuid::new_v4()),
            run_id: Set(payload.run_id),
            timestamp: Set(payload.timestamp),
            duration: Set(payload.duration),
            emissions_sum: Set(payload.emissions_sum),
            emissions_rate: Set(payload.emissions_rate),
            energy_consumed: Set(payload.energy_consumed),
            cpu_power: Set(payload.cpu_power),
            gpu_power: Set(payload.gpu_power),
            ram_power: Set(payload.ram_power),
            cpu_energy: Set(payload.cpu_energy),
            gpu_energy: Set(payload.gpu_energy),
            ram_energy: Set(payload.ram_energy),
            cpu_utilization_percent: Set(payload.cpu_utilization_percent),
            gpu_utilization_percent: Set(payload.gpu_utilization_percent),
            ram_utilization_percent: Set(payload.ram_utilization_percent),
            wue: Set(payload.wue),
        }
        .insert(self.write_conn())
        .await
        .map_err(Into::into)
    }

    /// Get emission by ID
    pub async fn get_emission(&self, id: Uuid) -> Result<Emission> {
        let row = EmissionEntity::find_by_id(id).one(self.read_conn()).await?;
        found(row, "Emission", id)
    }

    /// One page of a run's emissions by agent timestamp
    pub async fn list_emissions_from_run(
        &self,
        run_id: Uuid,
        request: PageRequest,
    ) -> Result<Page<Emission>> {
        request.validate()?;

        let paginator = EmissionEntity::find()
            .filter(EmissionColumn::RunId.eq(run_id))
            .order_by_asc(EmissionColumn::Timestamp)
            .order_by_asc(EmissionColumn::Id)
            .paginate(self.read_conn(), request.size);

        let counts = paginator.num_items_and_pages().await?;
        let items = paginator.fetch_page(request.page - 1).await?;

        Ok(Page {
            items,
            total: counts.number_of_items,
            page: request.page,
            size: request.size,
            pages: counts.number_of_pages,
        })
    }

    /// Project that owns an emission, through its run and experiment
    pub async fn project_id_of_emission(&self, id: Uuid) -> Result<Uuid> {
        let row = EmissionEntity::find_by_id(id)
            .select_only()
            .column(ExperimentColumn::ProjectId)
            .join(JoinType::InnerJoin, EmissionRelation::Run.def())
            .join(JoinType::InnerJoin, RunRelation::Experiment.def())
            .into_tuple::<Uuid>()
            .one(self.read_conn())
            .await?;
        found(row, "Emission", id)
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_emission_round_trip() {
        let repo = repo().await;
        let (_, _, project) = seed_project(&repo).await;
        let experiment = seed_experiment(&repo, project.id, "2024-01-01T00:00:00Z").await;
        let run = seed_run(&repo, experiment.id, "2024-01-01T00:00:05Z").await;

        let mut payload = emission(run.id, "2024-01-01T00:01:00Z", 0.5, 12.5);
        payload.wue = Some(1.8);
        let created = repo.create_emission(payload.clone()).await.unwrap();
        let fetched = repo.get_emission(created.id).await.unwrap();

        assert_eq!(fetched, created);
        assert_eq!(fetched.timestamp, payload.timestamp);
        assert_eq!(fetched.cpu_power, 12.5);
        assert_eq!(fetched.wue, Some(1.8));
        assert_eq!(repo.project_id_of_emission(created.id).await.unwrap(), project.id);
    }

    #[tokio::test]
    async fn test_emission_boundaries() {
        let repo = repo().await;
        let (_, _, project) = seed_project(&repo).await;
        let experiment = seed_experiment(&repo, project.id, "2024-01-01T00:00:00Z").await;
        let run = seed_run(&repo, experiment.id, "2024-01-01T00:00:05Z").await;

        let err = repo
            .create_emission(emission(Uuid::new_v4(), "2024-01-01T00:01:00Z", 0.5, 1.0))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let mut zero = emission(run.id, "2024-01-01T00:01:00Z", 0.5, 1.0);
        zero.duration = 0.0;
        let err = repo.create_emission(zero).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let page = repo
            .list_emissions_from_run(run.id, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_emission_pagination() {
        let repo = repo().await;
        let (_, _, project) = seed_project(&repo).await;
        let experiment = seed_experiment(&repo, project.id, "2024-01-01T00:00:00Z").await;
        let run = seed_run(&repo, experiment.id, "2024-01-01T00:00:05Z").await;
        for minute in 1..=5 {
            let ts = format!("2024-01-01T00:0{}:00Z", minute);
            repo.create_emission(emission(run.id, &ts, 0.1, 1.0)).await.unwrap();
        }

        let page = repo
            .list_emissions_from_run(run.id, PageRequest { page: 2, size: 2 })
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.pages, 3);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].timestamp, at("2024-01-01T00:03:00Z"));

        let err = repo
            .list_emissions_from_run(run.id, PageRequest { page: 0, size: 2 })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
