//! Schema migration history, applied at startup

use sea_orm_migration::prelude::*;

pub use sea_orm_migration::MigratorTrait;

mod m20240101_000001_create_tables;
mod m20240301_000001_add_project_tokens;
mod m20251119_000001_add_utilization_metrics;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_tables::Migration),
            Box::new(m20240301_000001_add_project_tokens::Migration),
            Box::new(m20251119_000001_add_utilization_metrics::Migration),
        ]
    }
}

#[derive(DeriveIden)]
pub(crate) enum Organizations {
    Table,
    Id,
    Name,
    Description,
    CreatedAt,
}

#[derive(DeriveIden)]
pub(crate) enum Users {
    Table,
    Id,
    Name,
    Email,
    IsActive,
    CreatedAt,
}

#[derive(DeriveIden)]
pub(crate) enum Memberships {
    Table,
    UserId,
    OrganizationId,
    IsAdmin,
}

#[derive(DeriveIden)]
pub(crate) enum Projects {
    Table,
    Id,
    Name,
    Description,
    OrganizationId,
    Public,
    CreatedAt,
}

#[derive(DeriveIden)]
pub(crate) enum ProjectTokens {
    Table,
    Id,
    ProjectId,
    Name,
    HashedToken,
    LookupValue,
    Access,
    ExpirationDate,
    LastUsed,
    Revoked,
    CreatedAt,
}

#[derive(DeriveIden)]
pub(crate) enum Experiments {
    Table,
    Id,
    ProjectId,
    Timestamp,
    Name,
    Description,
    CountryName,
    CountryIsoCode,
    Region,
    OnCloud,
    CloudProvider,
    CloudRegion,
}

#[derive(DeriveIden)]
pub(crate) enum Runs {
    Table,
    Id,
    ExperimentId,
    Timestamp,
    Os,
    PythonVersion,
    CodecarbonVersion,
    CpuCount,
    CpuModel,
    GpuCount,
    GpuModel,
    Longitude,
    Latitude,
    Region,
    Provider,
    RamTotalSize,
    TrackingMode,
}

#[derive(DeriveIden)]
pub(crate) enum Emissions {
    Table,
    Id,
    RunId,
    Timestamp,
    Duration,
    EmissionsSum,
    EmissionsRate,
    EnergyConsumed,
    CpuPower,
    GpuPower,
    RamPower,
    CpuEnergy,
    GpuEnergy,
    RamEnergy,
    CpuUtilizationPercent,
    GpuUtilizationPercent,
    RamUtilizationPercent,
    Wue,
}
