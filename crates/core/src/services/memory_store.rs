//! In-memory poll store.
//!
//! Emulates the database constraints (unique voter key per poll, options
//! belonging to their poll, cascading deletes, identity column widths) behind
//! a single mutex, so every operation is one indivisible step. Used by tests
//! and local demos.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use pollcast_common::{AppError, AppResult};
use pollcast_db::entities::{FINGERPRINT_MAX_LEN, USER_ID_MAX_LEN, poll, poll_option, vote};

use super::store::PollStore;

#[derive(Default)]
struct Tables {
    polls: HashMap<String, poll::Model>,
    options: HashMap<String, poll_option::Model>,
    /// Keyed by vote id (monotonic ULID).
    votes: BTreeMap<String, vote::Model>,
    voter_keys: HashSet<(String, String)>,
}

/// [`PollStore`] kept entirely in memory.
#[derive(Default)]
pub struct InMemoryPollStore {
    tables: Mutex<Tables>,
}

impl InMemoryPollStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> AppResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| AppError::Internal("In-memory store lock poisoned".to_string()))
    }
}

/// Same failure as a varchar overflow on the real columns.
fn check_width(column: &str, value: Option<&str>, max_len: usize) -> AppResult<()> {
    match value {
        Some(value) if value.chars().count() > max_len => Err(AppError::Database(format!(
            "value too long for {column} (max {max_len} characters)"
        ))),
        _ => Ok(()),
    }
}

fn check_new_poll(
    tables: &Tables,
    poll: &poll::Model,
    options: &[poll_option::Model],
) -> AppResult<()> {
    if tables.polls.contains_key(&poll.id) {
        return Err(AppError::Database(format!("duplicate poll id {}", poll.id)));
    }
    check_width("poll.owner_id", Some(&poll.owner_id), USER_ID_MAX_LEN)?;
    if let Some(code) = &poll.short_code
        && tables
            .polls
            .values()
            .any(|p| p.short_code.as_ref() == Some(code))
    {
        return Err(AppError::Database(format!("duplicate short code {code}")));
    }

    let mut ids = HashSet::new();
    let mut positions = HashSet::new();
    for option in options {
        if option.poll_id != poll.id {
            return Err(AppError::Database(format!(
                "option {} references poll {}",
                option.id, option.poll_id
            )));
        }
        if tables.options.contains_key(&option.id) || !ids.insert(option.id.as_str()) {
            return Err(AppError::Database(format!("duplicate option id {}", option.id)));
        }
        if !positions.insert(option.position) {
            return Err(AppError::Database(format!(
                "duplicate option position {}",
                option.position
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl PollStore for InMemoryPollStore {
    async fn insert_poll(
        &self,
        poll: poll::Model,
        options: Vec<poll_option::Model>,
    ) -> AppResult<(poll::Model, Vec<poll_option::Model>)> {
        let mut tables = self.tables()?;

        // Every check runs before the first write.
        check_new_poll(&tables, &poll, &options)?;

        tables.polls.insert(poll.id.clone(), poll.clone());
        for option in &options {
            tables.options.insert(option.id.clone(), option.clone());
        }
        Ok((poll, options))
    }

    async fn find_poll(&self, poll_id: &str) -> AppResult<Option<poll::Model>> {
        Ok(self.tables()?.polls.get(poll_id).cloned())
    }

    async fn find_poll_by_short_code(&self, code: &str) -> AppResult<Option<poll::Model>> {
        Ok(self
            .tables()?
            .polls
            .values()
            .find(|p| p.short_code.as_deref() == Some(code))
            .cloned())
    }

    async fn find_polls_by_owner(&self, owner_id: &str) -> AppResult<Vec<poll::Model>> {
        let mut polls: Vec<poll::Model> = self
            .tables()?
            .polls
            .values()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect();
        polls.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(polls)
    }

    async fn find_options(&self, poll_id: &str) -> AppResult<Vec<poll_option::Model>> {
        let mut options: Vec<poll_option::Model> = self
            .tables()?
            .options
            .values()
            .filter(|o| o.poll_id == poll_id)
            .cloned()
            .collect();
        options.sort_by_key(|o| o.position);
        Ok(options)
    }

    async fn find_option(
        &self,
        poll_id: &str,
        option_id: &str,
    ) -> AppResult<Option<poll_option::Model>> {
        Ok(self
            .tables()?
            .options
            .get(option_id)
            .filter(|o| o.poll_id == poll_id)
            .cloned())
    }

    async fn update_poll(&self, poll: poll::Model) -> AppResult<poll::Model> {
        let mut tables = self.tables()?;
        let stored = tables
            .polls
            .get_mut(&poll.id)
            .ok_or_else(|| AppError::NotFound("Poll not found".to_string()))?;

        stored.question = poll.question;
        stored.description = poll.description;
        stored.is_closed = poll.is_closed;
        stored.updated_at = poll.updated_at;
        Ok(stored.clone())
    }

    async fn delete_poll(&self, poll_id: &str) -> AppResult<bool> {
        let mut tables = self.tables()?;
        if tables.polls.remove(poll_id).is_none() {
            return Ok(false);
        }

        tables.options.retain(|_, o| o.poll_id != poll_id);
        tables.votes.retain(|_, v| v.poll_id != poll_id);
        tables.voter_keys.retain(|(p, _)| p != poll_id);
        Ok(true)
    }

    async fn insert_vote(&self, vote: vote::Model) -> AppResult<vote::Model> {
        check_width("vote.user_id", vote.user_id.as_deref(), USER_ID_MAX_LEN)?;
        check_width("vote.fingerprint", vote.fingerprint.as_deref(), FINGERPRINT_MAX_LEN)?;

        let mut tables = self.tables()?;

        let option_matches = tables
            .options
            .get(&vote.option_id)
            .is_some_and(|o| o.poll_id == vote.poll_id);
        if !tables.polls.contains_key(&vote.poll_id) || !option_matches {
            return Err(AppError::InvalidOption(format!(
                "Option is not part of poll {}",
                vote.poll_id
            )));
        }

        // Check and insert happen under the same lock.
        let key = (vote.poll_id.clone(), vote.voter_key.clone());
        if !tables.voter_keys.insert(key) {
            return Err(AppError::AlreadyVoted(vote.poll_id));
        }
        tables.votes.insert(vote.id.clone(), vote.clone());
        Ok(vote)
    }

    async fn has_vote(&self, poll_id: &str, voter_key: &str) -> AppResult<bool> {
        Ok(self
            .tables()?
            .voter_keys
            .contains(&(poll_id.to_string(), voter_key.to_string())))
    }

    async fn count_votes_by_option(&self, poll_id: &str) -> AppResult<HashMap<String, u64>> {
        let tables = self.tables()?;
        let mut counts = HashMap::new();
        for vote in tables.votes.values().filter(|v| v.poll_id == poll_id) {
            *counts.entry(vote.option_id.clone()).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn count_votes_by_poll(&self, poll_ids: &[String]) -> AppResult<HashMap<String, u64>> {
        let tables = self.tables()?;
        let mut counts = HashMap::new();
        for vote in tables.votes.values().filter(|v| poll_ids.contains(&v.poll_id)) {
            *counts.entry(vote.poll_id.clone()).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_poll(id: &str) -> poll::Model {
        poll::Model {
            id: id.to_string(),
            owner_id: "u1".to_string(),
            question: "Lunch?".to_string(),
            description: None,
            short_code: Some(format!("code-{id}")),
            is_closed: false,
            starts_at: None,
            ends_at: None,
            allow_multiple: false,
            max_choices: 1,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn test_option(id: &str, poll_id: &str, position: i32) -> poll_option::Model {
        poll_option::Model {
            id: id.to_string(),
            poll_id: poll_id.to_string(),
            text: id.to_string(),
            position,
        }
    }

    fn test_vote(id: &str, poll_id: &str, option_id: &str, voter_key: &str) -> vote::Model {
        vote::Model {
            id: id.to_string(),
            poll_id: poll_id.to_string(),
            option_id: option_id.to_string(),
            user_id: None,
            fingerprint: Some("fp".to_string()),
            voter_key: voter_key.to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_failed_option_insert_leaves_no_poll() {
        let store = InMemoryPollStore::new();

        // Second option clashes on position.
        let result = store
            .insert_poll(
                test_poll("p1"),
                vec![test_option("o1", "p1", 0), test_option("o2", "p1", 0)],
            )
            .await;

        assert!(matches!(result, Err(AppError::Database(_))));
        assert!(store.find_poll("p1").await.unwrap().is_none());
        assert!(store.find_options("p1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_option_of_other_poll_is_rejected() {
        let store = InMemoryPollStore::new();
        store
            .insert_poll(test_poll("p1"), vec![test_option("o1", "p1", 0)])
            .await
            .unwrap();
        store
            .insert_poll(test_poll("p2"), vec![test_option("o2", "p2", 0)])
            .await
            .unwrap();

        let result = store.insert_vote(test_vote("v1", "p1", "o2", "anon:fp")).await;
        assert!(matches!(result, Err(AppError::InvalidOption(_))));
    }

    #[tokio::test]
    async fn test_duplicate_voter_key_is_rejected() {
        let store = InMemoryPollStore::new();
        store
            .insert_poll(
                test_poll("p1"),
                vec![test_option("o1", "p1", 0), test_option("o2", "p1", 1)],
            )
            .await
            .unwrap();

        store
            .insert_vote(test_vote("v1", "p1", "o1", "anon:fp"))
            .await
            .unwrap();
        let second = store.insert_vote(test_vote("v2", "p1", "o2", "anon:fp")).await;

        assert!(matches!(second, Err(AppError::AlreadyVoted(_))));
        let counts = store.count_votes_by_option("p1").await.unwrap();
        assert_eq!(counts.get("o1"), Some(&1));
        assert_eq!(counts.get("o2"), None);
    }

    #[tokio::test]
    async fn test_identity_widths_match_columns() {
        let store = InMemoryPollStore::new();

        let mut wide_owner = test_poll("p0");
        wide_owner.owner_id = "u".repeat(USER_ID_MAX_LEN + 1);
        let result = store.insert_poll(wide_owner, vec![]).await;
        assert!(matches!(result, Err(AppError::Database(_))));
        assert!(store.find_poll("p0").await.unwrap().is_none());

        store
            .insert_poll(test_poll("p1"), vec![test_option("o1", "p1", 0)])
            .await
            .unwrap();
        let mut vote = test_vote("v1", "p1", "o1", "anon:wide");
        vote.fingerprint = Some("f".repeat(FINGERPRINT_MAX_LEN + 1));
        let result = store.insert_vote(vote).await;
        assert!(matches!(result, Err(AppError::Database(_))));
        assert!(!store.has_vote("p1", "anon:wide").await.unwrap());

        let mut vote = test_vote("v2", "p1", "o1", "anon:fits");
        vote.fingerprint = Some("f".repeat(FINGERPRINT_MAX_LEN));
        store.insert_vote(vote).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let store = InMemoryPollStore::new();
        store
            .insert_poll(test_poll("p1"), vec![test_option("o1", "p1", 0)])
            .await
            .unwrap();
        store
            .insert_vote(test_vote("v1", "p1", "o1", "anon:fp"))
            .await
            .unwrap();

        assert!(store.delete_poll("p1").await.unwrap());
        assert!(!store.delete_poll("p1").await.unwrap());
        assert!(store.find_options("p1").await.unwrap().is_empty());
        assert!(!store.has_vote("p1", "anon:fp").await.unwrap());
        assert!(
            store
                .count_votes_by_poll(&["p1".to_string()])
                .await
                .unwrap()
                .is_empty()
        );
    }
}
