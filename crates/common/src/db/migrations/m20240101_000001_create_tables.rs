//! Core hierarchy: organizations, users, memberships, projects, experiments,
//! runs and emissions.
//!
//! Every parent -> child edge cascades except organization -> project.

use super::{Emissions, Experiments, Memberships, Organizations, Projects, Runs, Users};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Organizations::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Organizations::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Organizations::Name).text().not_null())
                    .col(ColumnDef::new(Organizations::Description).text().not_null())
                    .col(
                        ColumnDef::new(Organizations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Users::Name).text().not_null())
                    .col(ColumnDef::new(Users::Email).text().not_null())
                    .col(
                        ColumnDef::new(Users::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Memberships::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Memberships::UserId).uuid().not_null())
                    .col(ColumnDef::new(Memberships::OrganizationId).uuid().not_null())
                    .col(
                        ColumnDef::new(Memberships::IsAdmin)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .primary_key(
                        Index::create()
                            .col(Memberships::UserId)
                            .col(Memberships::OrganizationId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_memberships_user")
                            .from(Memberships::Table, Memberships::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_memberships_organization")
                            .from(Memberships::Table, Memberships::OrganizationId)
                            .to(Organizations::Table, Organizations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Projects::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Projects::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Projects::Name).text().not_null())
                    .col(ColumnDef::new(Projects::Description).text().not_null())
                    .col(ColumnDef::new(Projects::OrganizationId).uuid().not_null())
                    .col(
                        ColumnDef::new(Projects::Public)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Projects::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_projects_organization")
                            .from(Projects::Table, Projects::OrganizationId)
                            .to(Organizations::Table, Organizations::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Experiments::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Experiments::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Experiments::ProjectId).uuid().not_null())
                    .col(
                        ColumnDef::new(Experiments::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Experiments::Name).text().not_null())
                    .col(ColumnDef::new(Experiments::Description).text())
                    .col(ColumnDef::new(Experiments::CountryName).text())
                    .col(ColumnDef::new(Experiments::CountryIsoCode).text())
                    .col(ColumnDef::new(Experiments::Region).text())
                    .col(
                        ColumnDef::new(Experiments::OnCloud)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Experiments::CloudProvider).text())
                    .col(ColumnDef::new(Experiments::CloudRegion).text())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_experiments_project")
                            .from(Experiments::Table, Experiments::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Runs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Runs::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Runs::ExperimentId).uuid().not_null())
                    .col(
                        ColumnDef::new(Runs::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Runs::Os).text())
                    .col(ColumnDef::new(Runs::PythonVersion).text())
                    .col(ColumnDef::new(Runs::CodecarbonVersion).text())
                    .col(ColumnDef::new(Runs::CpuCount).integer())
                    .col(ColumnDef::new(Runs::CpuModel).text())
                    .col(ColumnDef::new(Runs::GpuCount).integer())
                    .col(ColumnDef::new(Runs::GpuModel).text())
                    .col(ColumnDef::new(Runs::Longitude).double())
                    .col(ColumnDef::new(Runs::Latitude).double())
                    .col(ColumnDef::new(Runs::Region).text())
                    .col(ColumnDef::new(Runs::Provider).text())
                    .col(ColumnDef::new(Runs::RamTotalSize).double())
                    .col(ColumnDef::new(Runs::TrackingMode).text())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_runs_experiment")
                            .from(Runs::Table, Runs::ExperimentId)
                            .to(Experiments::Table, Experiments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Emissions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Emissions::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Emissions::RunId).uuid().not_null())
                    .col(
                        ColumnDef::new(Emissions::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Emissions::Duration).double().not_null())
                    .col(ColumnDef::new(Emissions::EmissionsSum).double().not_null())
                    .col(ColumnDef::new(Emissions::EmissionsRate).double().not_null())
                    .col(ColumnDef::new(Emissions::EnergyConsumed).double().not_null())
                    .col(ColumnDef::new(Emissions::CpuPower).double().not_null())
                    .col(ColumnDef::new(Emissions::GpuPower).double().not_null())
                    .col(ColumnDef::new(Emissions::RamPower).double().not_null())
                    .col(ColumnDef::new(Emissions::CpuEnergy).double().not_null())
                    .col(ColumnDef::new(Emissions::GpuEnergy).double().not_null())
                    .col(ColumnDef::new(Emissions::RamEnergy).double().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_emissions_run")
                            .from(Emissions::Table, Emissions::RunId)
                            .to(Runs::Table, Runs::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Foreign key and window indices
        manager
            .create_index(
                Index::create()
                    .name("idx_memberships_organization_id")
                    .table(Memberships::Table)
                    .col(Memberships::OrganizationId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_projects_organization_id")
                    .table(Projects::Table)
                    .col(Projects::OrganizationId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_experiments_project_id")
                    .table(Experiments::Table)
                    .col(Experiments::ProjectId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_runs_experiment_id")
                    .table(Runs::Table)
                    .col(Runs::ExperimentId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_emissions_run_id")
                    .table(Emissions::Table)
                    .col(Emissions::RunId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_emissions_timestamp")
                    .table(Emissions::Table)
                    .col(Emissions::Timestamp)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop tables in reverse order of creation
        manager
            .drop_table(Table::drop().table(Emissions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Runs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Experiments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Projects::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Memberships::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Organizations::Table).to_owned())
            .await?;
        Ok(())
    }
}
