//! Vote repository.

use std::sync::Arc;

use crate::entities::{vote, Vote};
use pollcast_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QuerySelect, Set, SqlErr,
};

/// Vote repository for database operations.
#[derive(Clone)]
pub struct VoteRepository {
    db: Arc<DatabaseConnection>,
}

impl VoteRepository {
    /// Create a new vote repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert a vote.
    ///
    /// This is a single `INSERT`; the unique `(poll_id, voter_key)` index
    /// decides whether it lands, so concurrent duplicates cannot both succeed.
    pub async fn create(&self, model: vote::Model) -> AppResult<vote::Model> {
        let poll_id = model.poll_id.clone();
        let active = vote::ActiveModel {
            id: Set(model.id),
            poll_id: Set(model.poll_id),
            option_id: Set(model.option_id),
            user_id: Set(model.user_id),
            fingerprint: Set(model.fingerprint),
            voter_key: Set(model.voter_key),
            created_at: Set(model.created_at),
        };

        active
            .insert(self.db.as_ref())
            .await
            .map_err(|e| map_insert_error(&e, &poll_id))
    }

    /// Check if a voter has voted on a poll.
    pub async fn exists(&self, poll_id: &str, voter_key: &str) -> AppResult<bool> {
        let count = Vote::find()
            .filter(vote::Column::PollId.eq(poll_id))
            .filter(vote::Column::VoterKey.eq(voter_key))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Vote counts per option for one poll. Options without votes are absent.
    pub async fn count_by_option(&self, poll_id: &str) -> AppResult<Vec<(String, i64)>> {
        Vote::find()
            .select_only()
            .column(vote::Column::OptionId)
            .column_as(vote::Column::Id.count(), "votes")
            .filter(vote::Column::PollId.eq(poll_id))
            .group_by(vote::Column::OptionId)
            .into_tuple::<(String, i64)>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Vote counts per poll. Polls without votes are absent.
    pub async fn count_by_poll(&self, poll_ids: &[String]) -> AppResult<Vec<(String, i64)>> {
        if poll_ids.is_empty() {
            return Ok(Vec::new());
        }

        Vote::find()
            .select_only()
            .column(vote::Column::PollId)
            .column_as(vote::Column::Id.count(), "votes")
            .filter(vote::Column::PollId.is_in(poll_ids.iter().cloned()))
            .group_by(vote::Column::PollId)
            .into_tuple::<(String, i64)>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

/// Translate constraint violations on vote insert into domain errors.
fn map_insert_error(err: &DbErr, poll_id: &str) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::AlreadyVoted(poll_id.to_string()),
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
            AppError::InvalidOption(format!("Option is not part of poll {poll_id}"))
        }
        _ => AppError::Database(err.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use maplit::btreemap;
    use sea_orm::{DatabaseBackend, MockDatabase, Value};

    #[tokio::test]
    async fn test_exists_false_without_votes() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[btreemap! {
                    "num_items" => Value::BigInt(Some(0)),
                }]])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        assert!(!repo.exists("poll1", "user:u1").await.unwrap());
    }

    #[tokio::test]
    async fn test_exists_true_with_vote() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[btreemap! {
                    "num_items" => Value::BigInt(Some(1)),
                }]])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        assert!(repo.exists("poll1", "user:u1").await.unwrap());
    }

    #[tokio::test]
    async fn test_count_by_poll_skips_query_for_empty_input() {
        // No query results queued: touching the database would fail.
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = VoteRepository::new(db);
        assert!(repo.count_by_poll(&[]).await.unwrap().is_empty());
    }

    #[test]
    fn test_map_insert_error_falls_back_to_store_error() {
        let err = DbErr::Custom("connection reset".to_string());
        assert!(matches!(
            map_insert_error(&err, "poll1"),
            AppError::Database(_)
        ));
    }
}
