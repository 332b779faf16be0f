//! Business logic services.

#![allow(missing_docs)]

pub mod memory_store;
pub mod poll;
pub mod store;
pub mod tally;
pub mod vote;
pub mod voter;

pub use memory_store::InMemoryPollStore;
pub use poll::{CreatePollInput, PollService, PollWithOptions, UpdatePollInput};
pub use store::{DatabasePollStore, PollStore, SharedPollStore};
pub use tally::{OptionTally, PollDetail, PollSummary, TallyService};
pub use vote::{VoteService, is_accepting_votes};
pub use voter::VoterIdentity;
