//! Vote ledger service.

use chrono::{DateTime, Utc};
use pollcast_common::{AppError, AppResult, IdGenerator, config::VotingConfig};
use pollcast_db::entities::{poll, vote};
use tracing::{debug, info};

use super::{store::SharedPollStore, voter::VoterIdentity};

/// Whether a poll takes votes at `now`, judged by its closed flag and
/// `[starts_at, ends_at)` window.
#[must_use]
pub fn is_accepting_votes(poll: &poll::Model, now: DateTime<Utc>) -> bool {
    if poll.is_closed {
        return false;
    }
    if let Some(starts_at) = poll.starts_at
        && now < starts_at
    {
        return false;
    }
    if let Some(ends_at) = poll.ends_at
        && now >= ends_at
    {
        return false;
    }
    true
}

/// Records votes, one per voter per poll.
#[derive(Clone)]
pub struct VoteService {
    store: SharedPollStore,
    voting: VotingConfig,
    id_gen: IdGenerator,
}

impl VoteService {
    /// Create a new vote service.
    #[must_use]
    pub const fn new(store: SharedPollStore, voting: VotingConfig) -> Self {
        Self {
            store,
            voting,
            id_gen: IdGenerator::new(),
        }
    }

    /// Cast a vote for `option_id` on `poll_id`.
    ///
    /// Uniqueness is left to the store's atomic insert; there is no
    /// check-then-insert here, so concurrent duplicates resolve to exactly
    /// one success and `AlreadyVoted` for the rest.
    pub async fn cast_vote(
        &self,
        poll_id: &str,
        option_id: &str,
        voter: &VoterIdentity,
    ) -> AppResult<vote::Model> {
        voter.validate()?;

        let poll = self
            .store
            .find_poll(poll_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Poll {poll_id}")))?;

        let now = Utc::now();
        if self.voting.enforce_poll_window && !is_accepting_votes(&poll, now) {
            return Err(AppError::PollClosed(poll_id.to_string()));
        }

        if self.store.find_option(poll_id, option_id).await?.is_none() {
            return Err(AppError::InvalidOption(format!(
                "Option {option_id} is not part of poll {poll_id}"
            )));
        }

        let model = vote::Model {
            id: self.id_gen.generate()?,
            poll_id: poll_id.to_string(),
            option_id: option_id.to_string(),
            user_id: voter.user_id().map(ToString::to_string),
            fingerprint: voter.fingerprint().map(ToString::to_string),
            voter_key: voter.voter_key(),
            created_at: now.into(),
        };

        match self.store.insert_vote(model).await {
            Ok(vote) => {
                info!(poll_id, option_id, vote_id = %vote.id, "Vote recorded");
                Ok(vote)
            }
            Err(err @ AppError::AlreadyVoted(_)) => {
                debug!(poll_id, voter_key = %voter.voter_key(), "Duplicate vote rejected");
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Whether `voter` already has a vote on `poll_id`.
    pub async fn has_voted(&self, poll_id: &str, voter: &VoterIdentity) -> AppResult<bool> {
        voter.validate()?;
        self.store.has_vote(poll_id, &voter.voter_key()).await
    }
}
