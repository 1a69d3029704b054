//! Pollboard core library.
//!
//! Domain models, poll status evaluation, vote statistics, and the vote
//! submission path shared by the server and the voting client.

pub mod models;
pub mod stats;
pub mod status;
pub mod submit;
pub mod validate;

pub use models::*;
pub use stats::{calculate_vote_stats, filter_unvoted_options};
pub use status::{PollStatus, poll_status, validate_poll_status};
pub use submit::{
    REFRESH_DELAY, StoreError, SubmitError, SubmitHooks, VoteStore, handle_submit_vote,
};
pub use validate::{ValidationErrors, is_valid_email, validate_new_poll};
