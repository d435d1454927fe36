//! Access-control evaluator
//!
//! Every protected operation names the entity it touches; the evaluator walks
//! that entity up to its project (or organization) and applies, in order:
//!
//! 1. reads of a public project and its descendants are open to everyone;
//! 2. users need a membership in the owning organization, and writes need
//!    `is_admin`;
//! 3. project tokens only reach their own project and its descendants,
//!    within their access level;
//! 4. anything else is refused.

use super::tokens::TokenService;
use crate::db::models::{AccessLevel, Project, User};
use crate::db::Repository;
use crate::errors::{AppError, Result};
use std::fmt;
use uuid::Uuid;

/// Who is making the request
#[derive(Debug, Clone)]
pub enum Principal {
    /// Authenticated through the identity provider
    User(User),
    /// Raw project token as presented, verified per project
    ProjectToken(String),
    Anonymous,
}

impl Principal {
    pub fn user(&self) -> Option<&User> {
        match self {
            Principal::User(user) => Some(user),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Principal::User(_) => "user",
            Principal::ProjectToken(_) => "project_token",
            Principal::Anonymous => "anonymous",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Write,
    /// Membership and token management; never granted to tokens
    Administer,
}

/// The entity an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Organization(Uuid),
    Project(Uuid),
    Experiment(Uuid),
    Run(Uuid),
    Emission(Uuid),
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Organization(id) => write!(f, "organization {}", id),
            Resource::Project(id) => write!(f, "project {}", id),
            Resource::Experiment(id) => write!(f, "experiment {}", id),
            Resource::Run(id) => write!(f, "run {}", id),
            Resource::Emission(id) => write!(f, "emission {}", id),
        }
    }
}

/// Decides whether a principal may act on a resource
#[derive(Clone)]
pub struct AccessControl {
    repo: Repository,
    tokens: TokenService,
}

impl AccessControl {
    pub fn new(repo: Repository, tokens: TokenService) -> Self {
        Self { repo, tokens }
    }

    /// Succeeds when `principal` may perform `action` on `resource`.
    ///
    /// A missing target is `NotFound`; a missing or invalid credential is
    /// `Unauthorized`; a valid credential without the permission is
    /// `Forbidden`.
    pub async fn authorize(&self, principal: &Principal, action: Action, resource: Resource) -> Result<()> {
        let project = match resource {
            Resource::Organization(id) => return self.authorize_organization(principal, action, id).await,
            Resource::Project(id) => self.repo.get_project(id).await?,
            Resource::Experiment(id) => {
                let project_id = self.repo.project_id_of_experiment(id).await?;
                self.repo.get_project(project_id).await?
            }
            Resource::Run(id) => {
                let project_id = self.repo.project_id_of_run(id).await?;
                self.repo.get_project(project_id).await?
            }
            Resource::Emission(id) => {
                let project_id = self.repo.project_id_of_emission(id).await?;
                self.repo.get_project(project_id).await?
            }
        };

        self.authorize_project(principal, action, &project, resource).await
    }

    async fn authorize_organization(&self, principal: &Principal, action: Action, id: Uuid) -> Result<()> {
        self.repo.get_organization(id).await?;
        match principal {
            Principal::User(user) => self.check_membership(user, action, id).await,
            Principal::ProjectToken(_) => Err(AppError::forbidden(
                "Project tokens cannot access organizations",
            )),
            Principal::Anonymous => Err(authentication_required()),
        }
    }

    async fn authorize_project(
        &self,
        principal: &Principal,
        action: Action,
        project: &Project,
        resource: Resource,
    ) -> Result<()> {
        if action == Action::Read && project.public {
            return Ok(());
        }

        match principal {
            Principal::User(user) => {
                self.check_membership(user, action, project.organization_id)
                    .await
            }
            Principal::ProjectToken(raw) => {
                let required = match action {
                    Action::Read => AccessLevel::Read,
                    Action::Write => AccessLevel::Write,
                    Action::Administer => {
                        return Err(AppError::forbidden(format!(
                            "Project tokens cannot administer {}",
                            resource
                        )))
                    }
                };
                self.tokens.verify(raw, project.id, required).await.map(|_| ())
            }
            Principal::Anonymous => Err(authentication_required()),
        }
    }

    async fn check_membership(&self, user: &User, action: Action, organization_id: Uuid) -> Result<()> {
        let membership = self
            .repo
            .get_membership(user.id, organization_id)
            .await?
            .ok_or_else(|| {
                AppError::forbidden(format!(
                    "User {} is not a member of organization {}",
                    user.id, organization_id
                ))
            })?;

        match action {
            Action::Read => Ok(()),
            Action::Write | Action::Administer if membership.is_admin => Ok(()),
            Action::Write | Action::Administer => Err(AppError::forbidden(format!(
                "User {} is not an admin of organization {}",
                user.id, organization_id
            ))),
        }
    }
}

fn authentication_required() -> AppError {
    AppError::unauthorized("Authentication required")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::tokens::{Argon2Hasher, RandomTokenGenerator};
    use crate::clock::SystemClock;
    use crate::db::fixtures::*;
    use crate::schemas::{ProjectCreate, ProjectTokenCreate};
    use axum::http::StatusCode;
    use std::sync::Arc;

    struct World {
        access: AccessControl,
        tokens: TokenService,
        repo: Repository,
        admin: User,
        organization_id: Uuid,
        project: Project,
        run_id: Uuid,
    }

    async fn world() -> World {
        let repo = repo().await;
        let (admin, organization, project) = seed_project(&repo).await;
        let experiment = seed_experiment(&repo, project.id, "2024-01-01T00:00:00Z").await;
        let run = seed_run(&repo, experiment.id, "2024-01-01T00:00:00Z").await;
        let tokens = TokenService::new(
            repo.clone(),
            Arc::new(Argon2Hasher::new(8, 1).unwrap()),
            Arc::new(RandomTokenGenerator),
            Arc::new(SystemClock),
        );
        World {
            access: AccessControl::new(repo.clone(), tokens.clone()),
            tokens,
            repo,
            admin,
            organization_id: organization.id,
            project,
            run_id: run.id,
        }
    }

    fn status(result: Result<()>) -> StatusCode {
        match result {
            Ok(()) => StatusCode::OK,
            Err(err) => err.status_code(),
        }
    }

    #[tokio::test]
    async fn test_admin_member_may_write() {
        let w = world().await;
        let admin = Principal::User(w.admin.clone());
        for resource in [
            Resource::Organization(w.organization_id),
            Resource::Project(w.project.id),
            Resource::Run(w.run_id),
        ] {
            assert_eq!(status(w.access.authorize(&admin, Action::Write, resource).await), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_plain_member_reads_only() {
        let w = world().await;
        let member = w
            .repo
            .create_user(Uuid::new_v4(), "Grace".into(), "grace@example.org".into())
            .await
            .unwrap();
        w.repo
            .add_organization_member(w.organization_id, member.id, false)
            .await
            .unwrap();
        let principal = Principal::User(member);

        assert_eq!(
            status(w.access.authorize(&principal, Action::Read, Resource::Run(w.run_id)).await),
            StatusCode::OK
        );
        assert_eq!(
            status(w.access.authorize(&principal, Action::Write, Resource::Project(w.project.id)).await),
            StatusCode::FORBIDDEN
        );
    }

    #[tokio::test]
    async fn test_membership_alone_decides_user_access() {
        let w = world().await;
        let mut admin = w.admin.clone();
        admin.is_active = false;
        let principal = Principal::User(admin);

        assert_eq!(
            status(w.access.authorize(&principal, Action::Read, Resource::Project(w.project.id)).await),
            StatusCode::OK
        );
        assert_eq!(
            status(w.access.authorize(&principal, Action::Write, Resource::Run(w.run_id)).await),
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn test_outsider_and_anonymous_are_refused() {
        let w = world().await;
        let outsider = w
            .repo
            .create_user(Uuid::new_v4(), "Eve".into(), "eve@example.org".into())
            .await
            .unwrap();

        assert_eq!(
            status(w.access.authorize(&Principal::User(outsider), Action::Read, Resource::Project(w.project.id)).await),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status(w.access.authorize(&Principal::Anonymous, Action::Read, Resource::Project(w.project.id)).await),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status(w.access.authorize(&Principal::Anonymous, Action::Read, Resource::Run(Uuid::new_v4())).await),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_public_project_is_readable_by_anyone() {
        let w = world().await;
        let public = w
            .repo
            .create_project(
                w.organization_id,
                ProjectCreate {
                    name: "Open".into(),
                    description: "".into(),
                    public: true,
                },
            )
            .await
            .unwrap();

        let anonymous = Principal::Anonymous;
        assert_eq!(
            status(w.access.authorize(&anonymous, Action::Read, Resource::Project(public.id)).await),
            StatusCode::OK
        );
        assert_eq!(
            status(w.access.authorize(&anonymous, Action::Write, Resource::Project(public.id)).await),
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn test_token_is_scoped_to_its_project() {
        let w = world().await;
        let issued = w
            .tokens
            .issue(
                w.project.id,
                ProjectTokenCreate {
                    name: "agent".into(),
                    access: AccessLevel::ReadWrite,
                    expiration_date: None,
                },
            )
            .await
            .unwrap();
        let token = Principal::ProjectToken(issued.token);

        assert_eq!(
            status(w.access.authorize(&token, Action::Write, Resource::Run(w.run_id)).await),
            StatusCode::OK
        );
        assert_eq!(
            status(w.access.authorize(&token, Action::Administer, Resource::Project(w.project.id)).await),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status(w.access.authorize(&token, Action::Read, Resource::Organization(w.organization_id)).await),
            StatusCode::FORBIDDEN
        );

        let other = w
            .repo
            .create_project(
                w.organization_id,
                ProjectCreate {
                    name: "Other".into(),
                    description: "".into(),
                    public: false,
                },
            )
            .await
            .unwrap();
        assert_eq!(
            status(w.access.authorize(&token, Action::Read, Resource::Project(other.id)).await),
            StatusCode::UNAUTHORIZED
        );
    }
}
