//! Create `vote` table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Vote::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Vote::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Vote::PollId).string_len(36).not_null())
                    .col(ColumnDef::new(Vote::OptionId).string_len(36).not_null())
                    .col(ColumnDef::new(Vote::UserId).string_len(128))
                    .col(ColumnDef::new(Vote::Fingerprint).string_len(256))
                    .col(ColumnDef::new(Vote::VoterKey).string_len(272).not_null())
                    .col(
                        ColumnDef::new(Vote::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_poll")
                            .from(Vote::Table, Vote::PollId)
                            .to(Poll::Table, Poll::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    // The option must belong to the same poll as the vote
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_option_same_poll")
                            .from_tbl(Vote::Table)
                            .from_col(Vote::OptionId)
                            .from_col(Vote::PollId)
                            .to_tbl(PollOption::Table)
                            .to_col(PollOption::Id)
                            .to_col(PollOption::PollId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .check(
                        Expr::col(Vote::UserId)
                            .is_not_null()
                            .or(Expr::col(Vote::Fingerprint).is_not_null()),
                    )
                    .to_owned(),
            )
            .await?;

        // One vote per voter per poll
        manager
            .create_index(
                Index::create()
                    .name("uq_vote_poll_id_voter_key")
                    .table(Vote::Table)
                    .col(Vote::PollId)
                    .col(Vote::VoterKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Per-option tallies
        manager
            .create_index(
                Index::create()
                    .name("idx_vote_option_id")
                    .table(Vote::Table)
                    .col(Vote::OptionId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Vote::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Vote {
    Table,
    Id,
    PollId,
    OptionId,
    UserId,
    Fingerprint,
    VoterKey,
    CreatedAt,
}

#[derive(Iden)]
enum Poll {
    Table,
    Id,
}

#[derive(Iden)]
enum PollOption {
    Table,
    Id,
    PollId,
}
