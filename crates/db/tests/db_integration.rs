//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `pollcast_test`)
//!   `TEST_DB_PASSWORD` (default: `pollcast_test`)
//!   `TEST_DB_NAME` (default: `pollcast_test`)

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use chrono::Utc;
use pollcast_common::{AppError, IdGenerator};
use pollcast_db::{
    entities::{FINGERPRINT_MAX_LEN, USER_ID_MAX_LEN, poll, poll_option, vote},
    repositories::{PollOptionRepository, PollRepository, VoteRepository},
    test_utils::{TestDatabase, TestDbConfig},
};
use sea_orm::{Database, Set};
use tokio::task::JoinSet;

/// Unique suffix so tests sharing a database never collide.
fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

struct Repos {
    polls: PollRepository,
    options: PollOptionRepository,
    votes: VoteRepository,
}

async fn repos() -> (TestDatabase, Repos) {
    let db = TestDatabase::new().await.expect("Failed to connect");
    let conn = Arc::new(Database::connect(db.config.database_url()).await.unwrap());
    let repos = Repos {
        polls: PollRepository::new(Arc::clone(&conn)),
        options: PollOptionRepository::new(Arc::clone(&conn)),
        votes: VoteRepository::new(conn),
    };
    (db, repos)
}

/// Insert a poll owned by `u1` with options `a` and `b`.
async fn insert_poll(repos: &Repos) -> (poll::Model, Vec<poll_option::Model>) {
    let poll_id = unique("poll");
    let poll = poll::ActiveModel {
        id: Set(poll_id.clone()),
        owner_id: Set("u1".to_string()),
        question: Set("Lunch?".to_string()),
        description: Set(None),
        // Column holds 16 characters.
        short_code: Set(Some(format!(
            "c{}",
            Utc::now().timestamp_nanos_opt().unwrap_or_default() % 100_000_000_000_000
        ))),
        is_closed: Set(false),
        starts_at: Set(None),
        ends_at: Set(None),
        allow_multiple: Set(false),
        max_choices: Set(1),
        created_at: Set(Utc::now().into()),
        updated_at: Set(None),
    };
    let options = ["a", "b"]
        .into_iter()
        .zip(0..)
        .map(|(text, position)| poll_option::ActiveModel {
            id: Set(format!("{poll_id}-{text}")),
            poll_id: Set(poll_id.clone()),
            text: Set(text.to_string()),
            position: Set(position),
        })
        .collect();

    repos.polls.create_with_options(poll, options).await.unwrap()
}

fn ballot(poll_id: &str, option_id: &str, fingerprint: &str) -> vote::Model {
    vote::Model {
        id: unique("vote"),
        poll_id: poll_id.to_string(),
        option_id: option_id.to_string(),
        user_id: None,
        fingerprint: Some(fingerprint.to_string()),
        voter_key: format!("anon:{fingerprint}"),
        created_at: Utc::now().into(),
    }
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_database_connection() {
    let config = TestDbConfig::default();
    let result = TestDatabase::with_config(config).await;
    assert!(result.is_ok(), "Failed to connect: {:?}", result.err());
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_create_with_options_is_readable() {
    let (_db, repos) = repos().await;
    let (poll, options) = insert_poll(&repos).await;

    let found = repos.polls.get_by_id(&poll.id).await.unwrap();
    assert_eq!(found.question, "Lunch?");

    let stored = repos.options.find_by_poll(&poll.id).await.unwrap();
    assert_eq!(stored, options);
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_failed_option_insert_rolls_back_poll() {
    let (_db, repos) = repos().await;
    let poll_id = unique("poll");
    let poll = poll::ActiveModel {
        id: Set(poll_id.clone()),
        owner_id: Set("u1".to_string()),
        question: Set("Lunch?".to_string()),
        description: Set(None),
        short_code: Set(None),
        is_closed: Set(false),
        starts_at: Set(None),
        ends_at: Set(None),
        allow_multiple: Set(false),
        max_choices: Set(1),
        created_at: Set(Utc::now().into()),
        updated_at: Set(None),
    };
    // Same position twice violates the unique (poll_id, position) index.
    let options = (0..2)
        .map(|i| poll_option::ActiveModel {
            id: Set(format!("{poll_id}-{i}")),
            poll_id: Set(poll_id.clone()),
            text: Set("dup".to_string()),
            position: Set(0),
        })
        .collect();

    let result = repos.polls.create_with_options(poll, options).await;
    assert!(result.is_err());
    assert!(repos.polls.find_by_id(&poll_id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_duplicate_vote_is_already_voted() {
    let (_db, repos) = repos().await;
    let (poll, options) = insert_poll(&repos).await;
    let fingerprint = unique("fp");

    repos
        .votes
        .create(ballot(&poll.id, &options[0].id, &fingerprint))
        .await
        .unwrap();
    let second = repos
        .votes
        .create(ballot(&poll.id, &options[1].id, &fingerprint))
        .await;

    assert!(matches!(second, Err(AppError::AlreadyVoted(_))));
    assert!(
        repos
            .votes
            .exists(&poll.id, &format!("anon:{fingerprint}"))
            .await
            .unwrap()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires running PostgreSQL instance"]
async fn test_concurrent_duplicate_votes_yield_one_success() {
    let (_db, repos) = repos().await;
    let (poll, options) = insert_poll(&repos).await;
    let fingerprint = unique("fp");
    let id_gen = IdGenerator::new();

    let mut attempts = JoinSet::new();
    for i in 0..16 {
        let votes = repos.votes.clone();
        let mut vote = ballot(&poll.id, &options[i % 2].id, &fingerprint);
        vote.id = id_gen.generate().unwrap();
        attempts.spawn(async move { votes.create(vote).await });
    }

    let mut successes = 0;
    let mut duplicates = 0;
    while let Some(result) = attempts.join_next().await {
        match result.unwrap() {
            Ok(_) => successes += 1,
            Err(AppError::AlreadyVoted(_)) => duplicates += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(duplicates, 15);

    let counts = repos.votes.count_by_option(&poll.id).await.unwrap();
    assert_eq!(counts.iter().map(|(_, n)| n).sum::<i64>(), 1);
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_identity_widths_fit_columns() {
    let (_db, repos) = repos().await;
    let (poll, options) = insert_poll(&repos).await;

    let fingerprint = format!("{}{}", unique("fp"), "f".repeat(FINGERPRINT_MAX_LEN))
        .chars()
        .take(FINGERPRINT_MAX_LEN)
        .collect::<String>();
    repos
        .votes
        .create(ballot(&poll.id, &options[0].id, &fingerprint))
        .await
        .unwrap();

    let user_id = format!("{}{}", unique("u"), "u".repeat(USER_ID_MAX_LEN))
        .chars()
        .take(USER_ID_MAX_LEN)
        .collect::<String>();
    let mut vote = ballot(&poll.id, &options[1].id, "unused");
    vote.user_id = Some(user_id.clone());
    vote.fingerprint = None;
    vote.voter_key = format!("user:{user_id}");
    repos.votes.create(vote).await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_vote_for_other_polls_option_is_rejected() {
    let (_db, repos) = repos().await;
    let (first, _) = insert_poll(&repos).await;
    let (_, other_options) = insert_poll(&repos).await;

    let result = repos
        .votes
        .create(ballot(&first.id, &other_options[0].id, &unique("fp")))
        .await;
    assert!(matches!(result, Err(AppError::InvalidOption(_))));
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_counts_and_cascade_delete() {
    let (_db, repos) = repos().await;
    let (poll, options) = insert_poll(&repos).await;

    for _ in 0..3 {
        repos
            .votes
            .create(ballot(&poll.id, &options[1].id, &unique("fp")))
            .await
            .unwrap();
    }

    let by_option = repos.votes.count_by_option(&poll.id).await.unwrap();
    assert_eq!(by_option, vec![(options[1].id.clone(), 3)]);

    let by_poll = repos
        .votes
        .count_by_poll(std::slice::from_ref(&poll.id))
        .await
        .unwrap();
    assert_eq!(by_poll, vec![(poll.id.clone(), 3)]);

    assert_eq!(repos.polls.delete(&poll.id).await.unwrap(), 1);
    assert!(repos.options.find_by_poll(&poll.id).await.unwrap().is_empty());
    assert!(repos.votes.count_by_option(&poll.id).await.unwrap().is_empty());
}

#[test]
fn test_config_from_env() {
    let config = TestDbConfig::default();
    assert!(!config.host.is_empty());
    assert!(config.port > 0);
    assert!(!config.username.is_empty());
    assert!(!config.database.is_empty());
}
