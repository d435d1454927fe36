//! Project-scoped API tokens

use super::{ProjectTokens, Projects};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProjectTokens::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ProjectTokens::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(ProjectTokens::ProjectId).uuid().not_null())
                    .col(ColumnDef::new(ProjectTokens::Name).text().not_null())
                    .col(ColumnDef::new(ProjectTokens::HashedToken).text().not_null())
                    .col(ColumnDef::new(ProjectTokens::LookupValue).text().not_null())
                    .col(ColumnDef::new(ProjectTokens::Access).integer().not_null())
                    .col(ColumnDef::new(ProjectTokens::ExpirationDate).timestamp_with_time_zone())
                    .col(ColumnDef::new(ProjectTokens::LastUsed).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(ProjectTokens::Revoked)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ProjectTokens::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_project_tokens_project")
                            .from(ProjectTokens::Table, ProjectTokens::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Non-unique: distinct tokens may share a lookup prefix
        manager
            .create_index(
                Index::create()
                    .name("idx_project_tokens_lookup")
                    .table(ProjectTokens::Table)
                    .col(ProjectTokens::LookupValue)
                    .col(ProjectTokens::ProjectId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProjectTokens::Table).to_owned())
            .await
    }
}
