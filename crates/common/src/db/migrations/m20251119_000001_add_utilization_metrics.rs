//! Utilization percentages and water usage effectiveness on emissions

use super::Emissions;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

const COLUMNS: [Emissions; 4] = [
    Emissions::CpuUtilizationPercent,
    Emissions::GpuUtilizationPercent,
    Emissions::RamUtilizationPercent,
    Emissions::Wue,
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // SQLite accepts a single column per ALTER TABLE
        for column in COLUMNS {
            manager
                .alter_table(
                    Table::alter()
                        .table(Emissions::Table)
                        .add_column(ColumnDef::new(column).double().null())
                        .to_owned(),
                )
                .await?;
        }
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for column in COLUMNS {
            manager
                .alter_table(
                    Table::alter()
                        .table(Emissions::Table)
                        .drop_column(column)
                        .to_owned(),
                )
                .await?;
        }
        Ok(())
    }
}
