//! Database entities.

/// Widest user id (`poll.owner_id`, `vote.user_id`) the schema stores, in characters.
pub const USER_ID_MAX_LEN: usize = 128;

/// Widest anonymous fingerprint (`vote.fingerprint`) the schema stores, in characters.
pub const FINGERPRINT_MAX_LEN: usize = 256;

pub mod poll;
pub mod poll_option;
pub mod vote;

pub use poll::Entity as Poll;
pub use poll_option::Entity as PollOption;
pub use vote::Entity as Vote;
