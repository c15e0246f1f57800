use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum OfflineActions {
    Table,
    Id,
    Kind,
    Payload,
    CreatedAt,
    RetryCount,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    /// Queue table for the app-local database. Insertion order doubles as
    /// replay order, so the id is an auto-incrementing integer rather than
    /// a UUID.
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OfflineActions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OfflineActions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OfflineActions::Kind).string().not_null())
                    .col(ColumnDef::new(OfflineActions::Payload).string().not_null())
                    .col(
                        ColumnDef::new(OfflineActions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OfflineActions::RetryCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OfflineActions::Table).to_owned())
            .await
    }
}
