//! Emission entity: one measurement interval reported by an agent

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "emissions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub run_id: Uuid,

    /// Agent-supplied, normalized to UTC
    pub timestamp: DateTimeUtc,

    /// Seconds, always > 0
    pub duration: f64,

    /// kgCO2eq
    pub emissions_sum: f64,

    /// kgCO2eq per second
    pub emissions_rate: f64,

    /// kWh
    pub energy_consumed: f64,

    pub cpu_power: f64,
    pub gpu_power: f64,
    pub ram_power: f64,

    pub cpu_energy: f64,
    pub gpu_energy: f64,
    pub ram_energy: f64,

    pub cpu_utilization_percent: Option<f64>,
    pub gpu_utilization_percent: Option<f64>,
    pub ram_utilization_percent: Option<f64>,

    /// Water usage effectiveness, L/kWh
    pub wue: Option<f64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::run::Entity",
        from = "Column::RunId",
        to = "super::run::Column::Id",
        on_delete = "Cascade"
    )]
    Run,
}

impl Related<super::run::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Run.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
