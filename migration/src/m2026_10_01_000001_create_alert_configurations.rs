//! Migration to create alert_configurations table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AlertConfigurations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AlertConfigurations::ConfigKey)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AlertConfigurations::Id).uuid().not_null())
                    .col(ColumnDef::new(AlertConfigurations::Level).string().not_null())
                    .col(
                        ColumnDef::new(AlertConfigurations::EntityId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AlertConfigurations::AlertType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AlertConfigurations::Version)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(AlertConfigurations::Config)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AlertConfigurations::IsOverride)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(AlertConfigurations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(AlertConfigurations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(AlertConfigurations::CreatedBy).string())
                    .col(ColumnDef::new(AlertConfigurations::UpdatedBy).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-alert_configurations-scope")
                    .table(AlertConfigurations::Table)
                    .col(AlertConfigurations::Level)
                    .col(AlertConfigurations::EntityId)
                    .col(AlertConfigurations::AlertType)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AlertConfigurations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AlertConfigurations {
    Table,
    ConfigKey,
    Id,
    Level,
    EntityId,
    AlertType,
    Version,
    Config,
    IsOverride,
    CreatedAt,
    UpdatedAt,
    CreatedBy,
    UpdatedBy,
}
