//! Create `poll` table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Poll::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Poll::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Poll::OwnerId).string_len(128).not_null())
                    .col(ColumnDef::new(Poll::Question).string_len(1024).not_null())
                    .col(ColumnDef::new(Poll::Description).text())
                    .col(ColumnDef::new(Poll::ShortCode).string_len(16).unique_key())
                    .col(
                        ColumnDef::new(Poll::IsClosed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Poll::StartsAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Poll::EndsAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Poll::AllowMultiple)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Poll::MaxChoices)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Poll::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Poll::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Owner listing ("my polls", newest first)
        manager
            .create_index(
                Index::create()
                    .name("idx_poll_owner_id_created_at")
                    .table(Poll::Table)
                    .col(Poll::OwnerId)
                    .col(Poll::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Poll::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Poll {
    Table,
    Id,
    OwnerId,
    Question,
    Description,
    ShortCode,
    IsClosed,
    StartsAt,
    EndsAt,
    AllowMultiple,
    MaxChoices,
    CreatedAt,
    UpdatedAt,
}
