//! Persistence interface for polls, options and votes.
//!
//! Services depend on [`PollStore`] rather than on a database connection, so
//! the ledger and aggregation logic run unchanged against PostgreSQL
//! ([`DatabasePollStore`]) or memory ([`super::InMemoryPollStore`]).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use pollcast_common::AppResult;
use pollcast_db::{
    entities::{poll, poll_option, vote},
    repositories::{PollOptionRepository, PollRepository, VoteRepository},
};
use sea_orm::Set;

/// Storage operations the services rely on.
///
/// Implementations must make [`insert_poll`](Self::insert_poll) and
/// [`insert_vote`](Self::insert_vote) atomic: a poll is never visible without
/// its options, and two inserts for the same `(poll_id, voter_key)` never both
/// succeed.
#[async_trait]
pub trait PollStore: Send + Sync {
    /// Insert a poll and all of its options as one unit.
    async fn insert_poll(
        &self,
        poll: poll::Model,
        options: Vec<poll_option::Model>,
    ) -> AppResult<(poll::Model, Vec<poll_option::Model>)>;

    /// Find a poll by ID.
    async fn find_poll(&self, poll_id: &str) -> AppResult<Option<poll::Model>>;

    /// Find a poll by share-link short code.
    async fn find_poll_by_short_code(&self, code: &str) -> AppResult<Option<poll::Model>>;

    /// Polls owned by a user, newest first.
    async fn find_polls_by_owner(&self, owner_id: &str) -> AppResult<Vec<poll::Model>>;

    /// Options of a poll ordered by position.
    async fn find_options(&self, poll_id: &str) -> AppResult<Vec<poll_option::Model>>;

    /// An option, only if it belongs to `poll_id`.
    async fn find_option(
        &self,
        poll_id: &str,
        option_id: &str,
    ) -> AppResult<Option<poll_option::Model>>;

    /// Persist the editable fields of a poll (text, closed flag, `updated_at`).
    async fn update_poll(&self, poll: poll::Model) -> AppResult<poll::Model>;

    /// Delete a poll with its options and votes. Returns whether it existed.
    async fn delete_poll(&self, poll_id: &str) -> AppResult<bool>;

    /// Record a vote, failing with `AlreadyVoted` if the voter key is taken.
    async fn insert_vote(&self, vote: vote::Model) -> AppResult<vote::Model>;

    /// Whether a vote exists for this voter key.
    async fn has_vote(&self, poll_id: &str, voter_key: &str) -> AppResult<bool>;

    /// Vote counts keyed by option ID. Options without votes may be absent.
    async fn count_votes_by_option(&self, poll_id: &str) -> AppResult<HashMap<String, u64>>;

    /// Vote counts keyed by poll ID. Polls without votes may be absent.
    async fn count_votes_by_poll(&self, poll_ids: &[String]) -> AppResult<HashMap<String, u64>>;
}

/// Shared handle to a poll store.
pub type SharedPollStore = Arc<dyn PollStore>;

/// [`PollStore`] backed by the sea-orm repositories.
#[derive(Clone)]
pub struct DatabasePollStore {
    poll_repo: PollRepository,
    option_repo: PollOptionRepository,
    vote_repo: VoteRepository,
}

impl DatabasePollStore {
    /// Create a new database-backed store.
    #[must_use]
    pub const fn new(
        poll_repo: PollRepository,
        option_repo: PollOptionRepository,
        vote_repo: VoteRepository,
    ) -> Self {
        Self {
            poll_repo,
            option_repo,
            vote_repo,
        }
    }
}

fn into_counts(rows: Vec<(String, i64)>) -> HashMap<String, u64> {
    rows.into_iter()
        .map(|(id, count)| (id, u64::try_from(count).unwrap_or_default()))
        .collect()
}

#[async_trait]
impl PollStore for DatabasePollStore {
    async fn insert_poll(
        &self,
        poll: poll::Model,
        options: Vec<poll_option::Model>,
    ) -> AppResult<(poll::Model, Vec<poll_option::Model>)> {
        let poll = poll::ActiveModel {
            id: Set(poll.id),
            owner_id: Set(poll.owner_id),
            question: Set(poll.question),
            description: Set(poll.description),
            short_code: Set(poll.short_code),
            is_closed: Set(poll.is_closed),
            starts_at: Set(poll.starts_at),
            ends_at: Set(poll.ends_at),
            allow_multiple: Set(poll.allow_multiple),
            max_choices: Set(poll.max_choices),
            created_at: Set(poll.created_at),
            updated_at: Set(poll.updated_at),
        };
        let options = options
            .into_iter()
            .map(|option| poll_option::ActiveModel {
                id: Set(option.id),
                poll_id: Set(option.poll_id),
                text: Set(option.text),
                position: Set(option.position),
            })
            .collect();

        self.poll_repo.create_with_options(poll, options).await
    }

    async fn find_poll(&self, poll_id: &str) -> AppResult<Option<poll::Model>> {
        self.poll_repo.find_by_id(poll_id).await
    }

    async fn find_poll_by_short_code(&self, code: &str) -> AppResult<Option<poll::Model>> {
        self.poll_repo.find_by_short_code(code).await
    }

    async fn find_polls_by_owner(&self, owner_id: &str) -> AppResult<Vec<poll::Model>> {
        self.poll_repo.find_by_owner(owner_id).await
    }

    async fn find_options(&self, poll_id: &str) -> AppResult<Vec<poll_option::Model>> {
        self.option_repo.find_by_poll(poll_id).await
    }

    async fn find_option(
        &self,
        poll_id: &str,
        option_id: &str,
    ) -> AppResult<Option<poll_option::Model>> {
        self.option_repo.find_in_poll(poll_id, option_id).await
    }

    async fn update_poll(&self, poll: poll::Model) -> AppResult<poll::Model> {
        let mut active: poll::ActiveModel = poll.clone().into();
        active.question = Set(poll.question);
        active.description = Set(poll.description);
        active.is_closed = Set(poll.is_closed);
        active.updated_at = Set(poll.updated_at);

        self.poll_repo.update(active).await
    }

    async fn delete_poll(&self, poll_id: &str) -> AppResult<bool> {
        Ok(self.poll_repo.delete(poll_id).await? > 0)
    }

    async fn insert_vote(&self, vote: vote::Model) -> AppResult<vote::Model> {
        self.vote_repo.create(vote).await
    }

    async fn has_vote(&self, poll_id: &str, voter_key: &str) -> AppResult<bool> {
        self.vote_repo.exists(poll_id, voter_key).await
    }

    async fn count_votes_by_option(&self, poll_id: &str) -> AppResult<HashMap<String, u64>> {
        Ok(into_counts(self.vote_repo.count_by_option(poll_id).await?))
    }

    async fn count_votes_by_poll(&self, poll_ids: &[String]) -> AppResult<HashMap<String, u64>> {
        Ok(into_counts(self.vote_repo.count_by_poll(poll_ids).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::hashmap;

    #[test]
    fn test_into_counts() {
        let counts = into_counts(vec![("opt1".to_string(), 3), ("opt2".to_string(), 1)]);
        assert_eq!(
            counts,
            hashmap! { "opt1".to_string() => 3, "opt2".to_string() => 1 }
        );
    }
}
