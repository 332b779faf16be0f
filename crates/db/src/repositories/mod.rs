//! Repositories wrapping sea-orm queries.

mod poll;
mod poll_option;
mod vote;

pub use poll::PollRepository;
pub use poll_option::PollOptionRepository;
pub use vote::VoteRepository;
