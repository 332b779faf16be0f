//! Poll option repository.

use std::sync::Arc;

use crate::entities::{poll_option, PollOption};
use pollcast_common::{AppError, AppResult};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

/// Poll option repository for database operations.
#[derive(Clone)]
pub struct PollOptionRepository {
    db: Arc<DatabaseConnection>,
}

impl PollOptionRepository {
    /// Create a new poll option repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Get the options of a poll in display order.
    pub async fn find_by_poll(&self, poll_id: &str) -> AppResult<Vec<poll_option::Model>> {
        PollOption::find()
            .filter(poll_option::Column::PollId.eq(poll_id))
            .order_by_asc(poll_option::Column::Position)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an option only if it belongs to the given poll.
    pub async fn find_in_poll(
        &self,
        poll_id: &str,
        option_id: &str,
    ) -> AppResult<Option<poll_option::Model>> {
        PollOption::find_by_id(option_id)
            .filter(poll_option::Column::PollId.eq(poll_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_option(id: &str, poll_id: &str, position: i32) -> poll_option::Model {
        poll_option::Model {
            id: id.to_string(),
            poll_id: poll_id.to_string(),
            text: format!("option {position}"),
            position,
        }
    }

    #[tokio::test]
    async fn test_find_by_poll() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    create_test_option("opt1", "poll1", 0),
                    create_test_option("opt2", "poll1", 1),
                ]])
                .into_connection(),
        );

        let repo = PollOptionRepository::new(db);
        let result = repo.find_by_poll("poll1").await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[1].position, 1);
    }

    #[tokio::test]
    async fn test_find_in_other_poll() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<poll_option::Model>::new()])
                .into_connection(),
        );

        let repo = PollOptionRepository::new(db);
        let result = repo.find_in_poll("poll2", "opt1").await.unwrap();

        assert!(result.is_none());
    }
}
