//! Vote aggregation.
//!
//! Counts are computed on demand from the vote ledger. Options are enumerated
//! first and the grouped counts joined onto them, so an option nobody voted
//! for still shows up with zero votes.

use std::collections::HashMap;

use chrono::Utc;
use pollcast_common::{AppError, AppResult};
use pollcast_db::entities::{poll, poll_option};
use serde::Serialize;

use super::{store::SharedPollStore, vote::is_accepting_votes, voter::VoterIdentity};

/// A poll with its overall vote total.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSummary {
    #[serde(flatten)]
    pub poll: poll::Model,
    pub total_votes: u64,
}

/// One option with its vote count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionTally {
    pub id: String,
    pub text: String,
    pub position: i32,
    pub votes: u64,
}

/// A poll with per-option counts and flags for the viewer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollDetail {
    pub poll: poll::Model,
    pub options: Vec<OptionTally>,
    /// Always the sum of `options[].votes`.
    pub total_votes: u64,
    pub has_voted: bool,
    pub is_owner: bool,
    /// Informational; only enforced when the voting window policy is on.
    pub is_open: bool,
}

/// Join grouped counts onto options, defaulting to zero.
fn tally_options(
    options: Vec<poll_option::Model>,
    counts: &HashMap<String, u64>,
) -> Vec<OptionTally> {
    options
        .into_iter()
        .map(|option| OptionTally {
            votes: counts.get(&option.id).copied().unwrap_or(0),
            id: option.id,
            text: option.text,
            position: option.position,
        })
        .collect()
}

/// Computes poll summaries and details.
#[derive(Clone)]
pub struct TallyService {
    store: SharedPollStore,
}

impl TallyService {
    /// Create a new tally service.
    #[must_use]
    pub const fn new(store: SharedPollStore) -> Self {
        Self { store }
    }

    /// An owner's polls, newest first, with their vote totals.
    pub async fn list_poll_summaries(&self, owner_id: &str) -> AppResult<Vec<PollSummary>> {
        let polls = self.store.find_polls_by_owner(owner_id).await?;
        if polls.is_empty() {
            return Ok(vec![]);
        }

        let ids: Vec<String> = polls.iter().map(|p| p.id.clone()).collect();
        let totals = self.store.count_votes_by_poll(&ids).await?;

        Ok(polls
            .into_iter()
            .map(|poll| PollSummary {
                total_votes: totals.get(&poll.id).copied().unwrap_or(0),
                poll,
            })
            .collect())
    }

    /// A poll with per-option counts.
    ///
    /// `has_voted` is looked up for whatever identity the viewer has;
    /// `is_owner` is only ever true for an authenticated viewer.
    ///
    /// The reads are not one snapshot. A poll always has at least two options,
    /// so finding none means it was deleted after `find_poll` and it is
    /// reported as missing.
    pub async fn get_poll_detail(
        &self,
        poll_id: &str,
        viewer: Option<&VoterIdentity>,
    ) -> AppResult<PollDetail> {
        let poll = self
            .store
            .find_poll(poll_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Poll {poll_id}")))?;

        let options = self.store.find_options(poll_id).await?;
        if options.is_empty() {
            return Err(AppError::NotFound(format!("Poll {poll_id}")));
        }
        let counts = self.store.count_votes_by_option(poll_id).await?;
        let options = tally_options(options, &counts);
        let total_votes: u64 = options.iter().map(|o| o.votes).sum();

        let has_voted = match viewer {
            Some(viewer) => self.store.has_vote(poll_id, &viewer.voter_key()).await?,
            None => false,
        };
        let is_owner = viewer
            .and_then(VoterIdentity::user_id)
            .is_some_and(|id| id == poll.owner_id);
        let is_open = is_accepting_votes(&poll, Utc::now());

        Ok(PollDetail {
            poll,
            options,
            total_votes,
            has_voted,
            is_owner,
            is_open,
        })
    }
}
