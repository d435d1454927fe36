use super::{found, Repository};
use crate::db::models::*;
use crate::errors::{AppError, Result};
use sea_orm::{ActiveModelTrait, EntityTrait, Set, TransactionTrait};
use tracing::info;
use uuid::Uuid;

/// Outcome of resolving an identity to a user row
#[derive(Debug, Clone)]
pub struct ProvisionedUser {
    pub user: User,
    /// True when this call created the user and its default workspace
    pub created: bool,
}

/// Description given to organizations created on first login
pub const DEFAULT_ORGANIZATION_DESCRIPTION: &str = "Default organization";

/// Name and description of projects created on first login
pub const DEFAULT_PROJECT_NAME: &str = "Default project";

impl Repository {
    // ========================================================================
    // User Operations
    // ========================================================================

    /// Insert a user row with an externally assigned id
    pub async fn create_user(&self, id: Uuid, name: String, email: String) -> Result<User> {
        UserActiveModel {
            id: Set(id),
            name: Set(name),
            email: Set(email),
            is_active: Set(true),
            created_at: Set(self.clock.now()),
        }
        .insert(self.write_conn())
        .await
        .map_err(Into::into)
    }

    /// Find user by ID
    pub async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        UserEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Get user by ID
    pub async fn get_user(&self, id: Uuid) -> Result<User> {
        found(self.find_user(id).await?, "User", id)
    }

    /// Return the user for `id`, creating it on first sight.
    ///
    /// A new user gets, in the same transaction, an organization named after
    /// them with an admin membership and one default project. When two
    /// requests race on the same identity the loser re-reads the winner's row.
    pub async fn provision_user(
        &self,
        id: Uuid,
        name: String,
        email: String,
    ) -> Result<ProvisionedUser> {
        if let Some(user) = UserEntity::find_by_id(id).one(self.write_conn()).await? {
            return Ok(ProvisionedUser {
                user,
                created: false,
            });
        }

        match self.create_user_workspace(id, name, email).await {
            Ok(user) => {
                info!(user_id = %user.id, "Provisioned new user with default workspace");
                Ok(ProvisionedUser {
                    user,
                    created: true,
                })
            }
            Err(err) => match UserEntity::find_by_id(id).one(self.write_conn()).await? {
                Some(user) => Ok(ProvisionedUser {
                    user,
                    created: false,
                }),
                None => Err(err),
            },
        }
    }

    async fn create_user_workspace(&self, id: Uuid, name: String, email: String) -> Result<User> {
        let now = self.clock.now();
        let txn = self.write_conn().begin().await?;

        let user = UserActiveModel {
            id: Set(id),
            name: Set(name.clone()),
            email: Set(email),
            is_active: Set(true),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let organization = OrganizationActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(if name.is_empty() { user.email.clone() } else { name }),
            description: Set(DEFAULT_ORGANIZATION_DESCRIPTION.to_string()),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        MembershipActiveModel {
            user_id: Set(user.id),
            organization_id: Set(organization.id),
            is_admin: Set(true),
        }
        .insert(&txn)
        .await?;

        ProjectActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(DEFAULT_PROJECT_NAME.to_string()),
            description: Set(DEFAULT_PROJECT_NAME.to_string()),
            organization_id: Set(organization.id),
            public: Set(false),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await.map_err(AppError::from)?;
        Ok(user)
    }
}
