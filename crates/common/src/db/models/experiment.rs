//! Experiment entity: a named grouping of runs

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "experiments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub project_id: Uuid,

    /// Agent-supplied, normalized to UTC
    pub timestamp: DateTimeUtc,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub country_name: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub country_iso_code: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub region: Option<String>,

    pub on_cloud: bool,

    #[sea_orm(column_type = "Text", nullable)]
    pub cloud_provider: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub cloud_region: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id",
        on_delete = "Cascade"
    )]
    Project,

    #[sea_orm(has_many = "super::run::Entity")]
    Runs,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl Related<super::run::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Runs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
