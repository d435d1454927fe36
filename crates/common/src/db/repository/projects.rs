use super::{found, Repository};
use crate::db::models::*;
use crate::errors::Result;
use crate::schemas::{ProjectCreate, ProjectUpdate};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tracing::info;
use uuid::Uuid;

impl Repository {
    // ========================================================================
    // Project Operations
    // ========================================================================

    /// Create a project inside an existing organization
    pub async fn create_project(&self, organization_id: Uuid, payload: ProjectCreate) -> Result<Project> {
        found(
            OrganizationEntity::find_by_id(organization_id)
                .one(self.write_conn())
                .await?,
            "Organization",
            organization_id,
        )?;

        ProjectActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(payload.name),
            description: Set(payload.description),
            organization_id: Set(organization_id),
            public: Set(payload.public),
            created_at: Set(self.clock.now()),
        }
        .insert(self.write_conn())
        .await
        .map_err(Into::into)
    }

    /// Get project by ID
    pub async fn get_project(&self, id: Uuid) -> Result<Project> {
        let row = ProjectEntity::find_by_id(id).one(self.read_conn()).await?;
        found(row, "Project", id)
    }

    /// Projects of an organization in creation order
    pub async fn list_projects_from_organization(&self, organization_id: Uuid) -> Result<Vec<Project>> {
        ProjectEntity::find()
            .filter(ProjectColumn::OrganizationId.eq(organization_id))
            .order_by_asc(ProjectColumn::CreatedAt)
            .order_by_asc(ProjectColumn::Id)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Patch name, description or visibility
    pub async fn update_project(&self, id: Uuid, payload: ProjectUpdate) -> Result<Project> {
        let existing = found(
            ProjectEntity::find_by_id(id).one(self.write_conn()).await?,
            "Project",
            id,
        )?;

        let mut active = existing.clone().into_active_model();
        if let Some(name) = payload.name {
            active.name = Set(name);
        }
        if let Some(description) = payload.description {
            active.description = Set(description);
        }
        if let Some(public) = payload.public {
            active.public = Set(public);
        }
        if !active.is_changed() {
            return Ok(existing);
        }
        active.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Delete a project with its experiments, runs, emissions and tokens.
    ///
    /// Descendants go through the foreign-key cascade, so the whole subtree
    /// disappears in one statement.
    pub async fn delete_project(&self, id: Uuid) -> Result<()> {
        let txn = self.write_conn().begin().await?;

        found(ProjectEntity::find_by_id(id).one(&txn).await?, "Project", id)?;
        ProjectEntity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        info!(project_id = %id, "Project deleted with descendants");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;
    use crate::clock::FixedClock;
    use axum::http::StatusCode;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_created_at_comes_from_clock() {
        let frozen = at("2024-02-29T12:00:00Z");
        let repo = repo().await.with_clock(Arc::new(FixedClock(frozen)));
        let (user, org, project) = seed_project(&repo).await;

        assert_eq!(user.created_at, frozen);
        assert_eq!(org.created_at, frozen);
        assert_eq!(project.created_at, frozen);
    }

    #[tokio::test]
    async fn test_projects_listed_in_creation_order() {
        let repo = repo().await;
        let (_, org, first) = seed_project(&repo).await;
        let second = repo
            .create_project(
                org.id,
                ProjectCreate {
                    name: "Inference".into(),
                    description: "".into(),
                    public: true,
                },
            )
            .await
            .unwrap();

        let projects = repo.list_projects_from_organization(org.id).await.unwrap();
        let ids: Vec<_> = projects.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);

        assert!(repo
            .list_projects_from_organization(Uuid::new_v4())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_create_project_in_missing_organization() {
        let repo = repo().await;
        let err = repo
            .create_project(
                Uuid::new_v4(),
                ProjectCreate {
                    name: "Orphan".into(),
                    description: "".into(),
                    public: false,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_project_cascades() {
        let repo = repo().await;
        let (_, org, project) = seed_project(&repo).await;
        let experiment = seed_experiment(&repo, project.id, "2024-01-01T00:00:00Z").await;
        let run = seed_run(&repo, experiment.id, "2024-01-01T00:00:01Z").await;
        let emission = repo
            .create_emission(emission(run.id, "2024-01-01T00:01:00Z", 0.5, 10.0))
            .await
            .unwrap();
        let token = repo
            .insert_project_token(
                project.id,
                "agent".into(),
                "hash".into(),
                "abcd1234".into(),
                AccessLevel::Write,
                None,
            )
            .await
            .unwrap();

        repo.delete_project(project.id).await.unwrap();

        assert_eq!(
            repo.get_experiment(experiment.id).await.unwrap_err().status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            repo.get_run(run.id).await.unwrap_err().status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            repo.get_emission(emission.id).await.unwrap_err().status_code(),
            StatusCode::NOT_FOUND
        );
        assert!(repo.list_project_tokens(project.id).await.unwrap().is_empty());
        assert!(repo
            .get_project_token(project.id, token.id)
            .await
            .is_err());
        assert!(repo.get_organization(org.id).await.is_ok());

        let err = repo.delete_project(project.id).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_project_visibility() {
        let repo = repo().await;
        let (_, _, project) = seed_project(&repo).await;
        let updated = repo
            .update_project(
                project.id,
                ProjectUpdate {
                    public: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(updated.public);
        assert_eq!(updated.name, project.name);
    }
}
