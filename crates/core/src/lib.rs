//! Core business logic for pollcast.
//!
//! Three services share one injected [`PollStore`]:
//!
//! - [`PollService`]: create, read, edit and delete polls with their options
//! - [`VoteService`]: the vote ledger (one vote per voter per poll)
//! - [`TallyService`]: read-only vote aggregation for display

pub mod services;

pub use services::*;
