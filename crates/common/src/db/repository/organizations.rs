use super::{found, Repository};
use crate::db::models::*;
use crate::errors::{AppError, Result};
use crate::schemas::{OrganizationCreate, OrganizationUpdate};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use sea_orm::sea_query::JoinType;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user's membership as listed on an organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
}

impl Repository {
    // ========================================================================
    // Organization Operations
    // ========================================================================

    /// Create an organization with `creator` as its first admin member
    pub async fn create_organization(
        &self,
        creator: Uuid,
        payload: OrganizationCreate,
    ) -> Result<Organization> {
        let txn = self.write_conn().begin().await?;

        let organization = OrganizationActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(payload.name),
            description: Set(payload.description),
            created_at: Set(self.clock.now()),
        }
        .insert(&txn)
        .await?;

        MembershipActiveModel {
            user_id: Set(creator),
            organization_id: Set(organization.id),
            is_admin: Set(true),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok(organization)
    }

    /// Get organization by ID
    pub async fn get_organization(&self, id: Uuid) -> Result<Organization> {
        let row = OrganizationEntity::find_by_id(id).one(self.read_conn()).await?;
        found(row, "Organization", id)
    }

    /// Organizations the user belongs to, oldest first
    pub async fn list_organizations_for_user(&self, user_id: Uuid) -> Result<Vec<Organization>> {
        OrganizationEntity::find()
            .join(JoinType::InnerJoin, OrganizationRelation::Memberships.def())
            .filter(MembershipColumn::UserId.eq(user_id))
            .order_by_asc(OrganizationColumn::CreatedAt)
            .order_by_asc(OrganizationColumn::Id)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Rename or re-describe an organization
    pub async fn update_organization(
        &self,
        id: Uuid,
        payload: OrganizationUpdate,
    ) -> Result<Organization> {
        let existing = found(
            OrganizationEntity::find_by_id(id).one(self.write_conn()).await?,
            "Organization",
            id,
        )?;

        let mut active = existing.clone().into_active_model();
        if let Some(name) = payload.name {
            active.name = Set(name);
        }
        if let Some(description) = payload.description {
            active.description = Set(description);
        }
        if !active.is_changed() {
            return Ok(existing);
        }
        active.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Delete an organization that no longer holds projects.
    ///
    /// Projects do not cascade from their organization, so any remaining
    /// project is a `Conflict`. Memberships are removed with the row.
    pub async fn delete_organization(&self, id: Uuid) -> Result<()> {
        let txn = self.write_conn().begin().await?;

        found(OrganizationEntity::find_by_id(id).one(&txn).await?, "Organization", id)?;

        let projects = ProjectEntity::find()
            .filter(ProjectColumn::OrganizationId.eq(id))
            .count(&txn)
            .await?;
        if projects > 0 {
            return Err(AppError::Conflict {
                message: format!(
                    "Organization {} still has {} project(s); delete them first",
                    id, projects
                ),
            });
        }

        OrganizationEntity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        Ok(())
    }

    // ========================================================================
    // Membership Operations
    // ========================================================================

    /// Membership row for a (user, organization) pair
    pub async fn get_membership(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<Membership>> {
        MembershipEntity::find_by_id((user_id, organization_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Members of an organization with their user details
    pub async fn list_organization_members(&self, organization_id: Uuid) -> Result<Vec<Member>> {
        let rows = MembershipEntity::find()
            .filter(MembershipColumn::OrganizationId.eq(organization_id))
            .find_also_related(UserEntity)
            .order_by_asc(UserColumn::Name)
            .all(self.read_conn())
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(membership, user)| {
                user.map(|user| Member {
                    user_id: user.id,
                    name: user.name,
                    email: user.email,
                    is_admin: membership.is_admin,
                })
            })
            .collect())
    }

    /// Add an existing user to an organization
    pub async fn add_organization_member(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        is_admin: bool,
    ) -> Result<Membership> {
        let txn = self.write_conn().begin().await?;

        found(
            OrganizationEntity::find_by_id(organization_id).one(&txn).await?,
            "Organization",
            organization_id,
        )?;
        found(UserEntity::find_by_id(user_id).one(&txn).await?, "User", user_id)?;

        if MembershipEntity::find_by_id((user_id, organization_id))
            .one(&txn)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict {
                message: format!(
                    "User {} is already a member of organization {}",
                    user_id, organization_id
                ),
            });
        }

        let membership = MembershipActiveModel {
            user_id: Set(user_id),
            organization_id: Set(organization_id),
            is_admin: Set(is_admin),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok(membership)
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_creator_becomes_admin() {
        let repo = repo().await;
        let (user, org, _) = seed_project(&repo).await;

        let membership = repo.get_membership(user.id, org.id).await.unwrap().unwrap();
        assert!(membership.is_admin);

        let orgs = repo.list_organizations_for_user(user.id).await.unwrap();
        assert_eq!(orgs.len(), 1);
        assert_eq!(orgs[0].id, org.id);
    }

    #[tokio::test]
    async fn test_delete_organization_with_projects_conflicts() {
        let repo = repo().await;
        let (_, org, project) = seed_project(&repo).await;

        let err = repo.delete_organization(org.id).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert!(repo.get_organization(org.id).await.is_ok());

        repo.delete_project(project.id).await.unwrap();
        repo.delete_organization(org.id).await.unwrap();
        let err = repo.get_organization(org.id).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_add_member() {
        let repo = repo().await;
        let (_, org, _) = seed_project(&repo).await;
        let bob = repo
            .create_user(Uuid::new_v4(), "Bob".into(), "bob@example.org".into())
            .await
            .unwrap();

        repo.add_organization_member(org.id, bob.id, false).await.unwrap();
        let err = repo
            .add_organization_member(org.id, bob.id, true)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        let err = repo
            .add_organization_member(org.id, Uuid::new_v4(), false)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let members = repo.list_organization_members(org.id).await.unwrap();
        assert_eq!(members.len(), 2);
        assert!(members.iter().any(|m| m.user_id == bob.id && !m.is_admin));
    }

    #[tokio::test]
    async fn test_update_organization() {
        let repo = repo().await;
        let (_, org, _) = seed_project(&repo).await;

        let updated = repo
            .update_organization(
                org.id,
                OrganizationUpdate {
                    name: Some("Renamed".into()),
                    description: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.description, org.description);

        let unchanged = repo
            .update_organization(org.id, OrganizationUpdate::default())
            .await
            .unwrap();
        assert_eq!(unchanged.name, "Renamed");
    }
}
