//! Run entity: one tracked execution of a program

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "runs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub experiment_id: Uuid,

    /// Agent-supplied, normalized to UTC
    pub timestamp: DateTimeUtc,

    #[sea_orm(column_type = "Text", nullable)]
    pub os: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub python_version: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub codecarbon_version: Option<String>,

    pub cpu_count: Option<i32>,

    #[sea_orm(column_type = "Text", nullable)]
    pub cpu_model: Option<String>,

    pub gpu_count: Option<i32>,

    #[sea_orm(column_type = "Text", nullable)]
    pub gpu_model: Option<String>,

    pub longitude: Option<f64>,

    pub latitude: Option<f64>,

    #[sea_orm(column_type = "Text", nullable)]
    pub region: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub provider: Option<String>,

    /// GB
    pub ram_total_size: Option<f64>,

    #[sea_orm(column_type = "Text", nullable)]
    pub tracking_mode: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::experiment::Entity",
        from = "Column::ExperimentId",
        to = "super::experiment::Column::Id",
        on_delete = "Cascade"
    )]
    Experiment,

    #[sea_orm(has_many = "super::emission::Entity")]
    Emissions,
}

impl Related<super::experiment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Experiment.def()
    }
}

impl Related<super::emission::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Emissions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
