use sea_orm_migration::prelude::*;

use crate::m20260110_081500_groups::Groups;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Balances {
    Table,
    Id,
    GroupId,
    FromUser,
    ToUser,
    AmountMinor,
    UpdatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Balances::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Balances::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Balances::GroupId).string().not_null())
                    .col(ColumnDef::new(Balances::FromUser).string().not_null())
                    .col(ColumnDef::new(Balances::ToUser).string().not_null())
                    .col(
                        ColumnDef::new(Balances::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Balances::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-balances-group_id")
                            .from(Balances::Table, Balances::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // At most one row per ordered pair within a group.
        manager
            .create_index(
                Index::create()
                    .name("idx-balances-pair")
                    .table(Balances::Table)
                    .col(Balances::GroupId)
                    .col(Balances::FromUser)
                    .col(Balances::ToUser)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Balances::Table).to_owned())
            .await
    }
}
