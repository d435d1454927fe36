use super::{found, Repository};
use crate::db::models::*;
use crate::errors::Result;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

impl Repository {
    // ========================================================================
    // Project Token Operations
    // ========================================================================

    /// Store a freshly issued token. Only the hash and lookup value are kept.
    pub async fn insert_project_token(
        &self,
        project_id: Uuid,
        name: String,
        hashed_token: String,
        lookup_value: String,
        access: AccessLevel,
        expiration_date: Option<DateTime<Utc>>,
    ) -> Result<ProjectToken> {
        found(
            ProjectEntity::find_by_id(project_id).one(self.write_conn()).await?,
            "Project",
            project_id,
        )?;

        ProjectTokenActiveModel {
            id: Set(Uuid::new_v4()),
            project_id: Set(project_id),
            name: Set(name),
            hashed_token: Set(hashed_token),
            lookup_value: Set(lookup_value),
            access: Set(access.into()),
            expiration_date: Set(expiration_date),
            last_used: Set(None),
            revoked: Set(false),
            created_at: Set(self.clock.now()),
        }
        .insert(self.write_conn())
        .await
        .map_err(Into::into)
    }

    /// Unrevoked tokens of a project sharing a lookup value
    pub async fn find_token_candidates(
        &self,
        lookup_value: &str,
        project_id: Uuid,
    ) -> Result<Vec<ProjectToken>> {
        ProjectTokenEntity::find()
            .filter(ProjectTokenColumn::LookupValue.eq(lookup_value))
            .filter(ProjectTokenColumn::ProjectId.eq(project_id))
            .filter(ProjectTokenColumn::Revoked.eq(false))
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Stamp `last_used`. Concurrent callers race; the last write wins.
    pub async fn touch_project_token(&self, token_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        ProjectTokenEntity::update_many()
            .col_expr(ProjectTokenColumn::LastUsed, Expr::value(Some(at)))
            .filter(ProjectTokenColumn::Id.eq(token_id))
            .exec(self.write_conn())
            .await?;
        Ok(())
    }

    /// Tokens of a project, oldest first
    pub async fn list_project_tokens(&self, project_id: Uuid) -> Result<Vec<ProjectToken>> {
        ProjectTokenEntity::find()
            .filter(ProjectTokenColumn::ProjectId.eq(project_id))
            .order_by_asc(ProjectTokenColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Get a token that must belong to `project_id`
    pub async fn get_project_token(&self, project_id: Uuid, token_id: Uuid) -> Result<ProjectToken> {
        let row = ProjectTokenEntity::find_by_id(token_id)
            .filter(ProjectTokenColumn::ProjectId.eq(project_id))
            .one(self.read_conn())
            .await?;
        found(row, "ProjectToken", token_id)
    }

    /// Mark a token revoked; the row stays for auditing
    pub async fn revoke_project_token(&self, project_id: Uuid, token_id: Uuid) -> Result<ProjectToken> {
        let row = ProjectTokenEntity::find_by_id(token_id)
            .filter(ProjectTokenColumn::ProjectId.eq(project_id))
            .one(self.write_conn())
            .await?;
        let token = found(row, "ProjectToken", token_id)?;
        if token.revoked {
            return Ok(token);
        }

        let mut active = token.into_active_model();
        active.revoked = Set(true);
        active.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Remove a token row
    pub async fn delete_project_token(&self, project_id: Uuid, token_id: Uuid) -> Result<()> {
        let result = ProjectTokenEntity::delete_many()
            .filter(ProjectTokenColumn::Id.eq(token_id))
            .filter(ProjectTokenColumn::ProjectId.eq(project_id))
            .exec(self.write_conn())
            .await?;
        if result.rows_affected == 0 {
            return Err(crate::errors::AppError::not_found("ProjectToken", token_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;

    #[tokio::test]
    async fn test_candidates_exclude_revoked_and_foreign_projects() {
        let repo = repo().await;
        let (_, org, project) = seed_project(&repo).await;
        let other = repo
            .create_project(
                org.id,
                crate::schemas::ProjectCreate {
                    name: "Other".into(),
                    description: "".into(),
                    public: false,
                },
            )
            .await
            .unwrap();

        let live = repo
            .insert_project_token(project.id, "a".into(), "h1".into(), "lk".into(), AccessLevel::Write, None)
            .await
            .unwrap();
        let revoked = repo
            .insert_project_token(project.id, "b".into(), "h2".into(), "lk".into(), AccessLevel::Write, None)
            .await
            .unwrap();
        repo.insert_project_token(other.id, "c".into(), "h3".into(), "lk".into(), AccessLevel::Write, None)
            .await
            .unwrap();

        let revoked = repo.revoke_project_token(project.id, revoked.id).await.unwrap();
        assert!(revoked.revoked);

        let candidates = repo.find_token_candidates("lk", project.id).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, live.id);
        assert_eq!(candidates[0].access_level(), Some(AccessLevel::Write));
    }

    #[tokio::test]
    async fn test_touch_and_delete() {
        let repo = repo().await;
        let (_, _, project) = seed_project(&repo).await;
        let token = repo
            .insert_project_token(project.id, "a".into(), "h".into(), "lk".into(), AccessLevel::Read, None)
            .await
            .unwrap();
        assert!(token.last_used.is_none());

        let when = at("2024-05-01T12:00:00Z");
        repo.touch_project_token(token.id, when).await.unwrap();
        let token = repo.get_project_token(project.id, token.id).await.unwrap();
        assert_eq!(token.last_used, Some(when));

        assert!(repo.get_project_token(uuid::Uuid::new_v4(), token.id).await.is_err());
        repo.delete_project_token(project.id, token.id).await.unwrap();
        assert!(repo.delete_project_token(project.id, token.id).await.is_err());
    }
}
