use sea_orm_migration::prelude::*;

use crate::m20260110_081500_groups::Groups;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum PaymentRecords {
    Table,
    Id,
    GroupId,
    FromUser,
    ToUser,
    AmountMinor,
    Method,
    Note,
    CreatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PaymentRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PaymentRecords::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PaymentRecords::GroupId).string().not_null())
                    .col(ColumnDef::new(PaymentRecords::FromUser).string().not_null())
                    .col(ColumnDef::new(PaymentRecords::ToUser).string().not_null())
                    .col(
                        ColumnDef::new(PaymentRecords::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PaymentRecords::Method).string().not_null())
                    .col(ColumnDef::new(PaymentRecords::Note).string())
                    .col(
                        ColumnDef::new(PaymentRecords::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-payment_records-group_id")
                            .from(PaymentRecords::Table, PaymentRecords::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-payment_records-group_id-created_at")
                    .table(PaymentRecords::Table)
                    .col(PaymentRecords::GroupId)
                    .col(PaymentRecords::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PaymentRecords::Table).to_owned())
            .await
    }
}
