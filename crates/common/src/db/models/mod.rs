//! SeaORM entity models
//!
//! Organization -> Project -> Experiment -> Run -> Emission, plus users,
//! memberships and project tokens.

mod emission;
mod experiment;
mod membership;
mod organization;
mod project;
mod project_token;
mod run;
mod user;

pub use organization::{
    Entity as OrganizationEntity,
    Model as Organization,
    ActiveModel as OrganizationActiveModel,
    Column as OrganizationColumn,
    Relation as OrganizationRelation,
};

pub use user::{
    Entity as UserEntity,
    Model as User,
    ActiveModel as UserActiveModel,
    Column as UserColumn,
};

pub use membership::{
    Entity as MembershipEntity,
    Model as Membership,
    ActiveModel as MembershipActiveModel,
    Column as MembershipColumn,
    Relation as MembershipRelation,
};

pub use project::{
    Entity as ProjectEntity,
    Model as Project,
    ActiveModel as ProjectActiveModel,
    Column as ProjectColumn,
    Relation as ProjectRelation,
};

pub use project_token::{
    Entity as ProjectTokenEntity,
    Model as ProjectToken,
    ActiveModel as ProjectTokenActiveModel,
    Column as ProjectTokenColumn,
    AccessLevel,
};

pub use experiment::{
    Entity as ExperimentEntity,
    Model as Experiment,
    ActiveModel as ExperimentActiveModel,
    Column as ExperimentColumn,
    Relation as ExperimentRelation,
};

pub use run::{
    Entity as RunEntity,
    Model as Run,
    ActiveModel as RunActiveModel,
    Column as RunColumn,
    Relation as RunRelation,
};

pub use emission::{
    Entity as EmissionEntity,
    Model as Emission,
    ActiveModel as EmissionActiveModel,
    Column as EmissionColumn,
    Relation as EmissionRelation,
};
