//! Vote submission: validation, concurrent fan-out, caller feedback.

use std::time::Duration;

use futures::future::join_all;
use thiserror::Error;
use tokio::time::sleep;
use uuid::Uuid;

use crate::models::{Vote, VoteRecord, VoterIdentity};

/// Pause between a successful submission and the refresh callback, so the
/// success state is visible before results re-render.
pub const REFRESH_DELAY: Duration = Duration::from_millis(1500);

/// A failure reported by the vote store for one write.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StoreError(pub String);

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// The one capability the submission path needs from its environment:
/// persist a single vote. Injected so tests and alternative transports can
/// substitute their own.
#[allow(async_fn_in_trait)]
pub trait VoteStore {
    async fn submit_vote(&self, record: &VoteRecord) -> Result<Vote, StoreError>;
}

/// Caller-supplied state updates: error text, success flag, submitting flag,
/// and a refresh trigger fired after a successful submission settles.
pub trait SubmitHooks {
    fn set_error(&mut self, message: &str);
    fn set_success(&mut self, success: bool);
    fn set_submitting(&mut self, submitting: bool);
    fn refresh(&mut self);
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("Please select at least one option")]
    EmptySelection,
    #[error("Please provide your name and email for anonymous voting")]
    MissingIdentity,
    #[error("{0}")]
    Store(String),
    #[error("Failed to submit vote")]
    Unexpected,
}

/// Submit one vote per selected option on behalf of one voter.
///
/// Validates first (no write is attempted on a validation failure), then
/// issues all writes concurrently and joins them all. If any write fails the
/// first failure's message is surfaced through `set_error`; writes that
/// already landed are not rolled back. On success the refresh trigger fires
/// after [`REFRESH_DELAY`]. The submitting flag is cleared on every path
/// before the delayed refresh.
pub async fn handle_submit_vote<S, H>(
    store: &S,
    hooks: &mut H,
    selected_options: &[Uuid],
    poll_id: Uuid,
    user_id: Option<&str>,
    voter_email: &str,
    voter_name: &str,
) where
    S: VoteStore,
    H: SubmitHooks,
{
    hooks.set_error("");
    hooks.set_success(false);

    if let Err(err) = validate_submission(selected_options, user_id, voter_email, voter_name) {
        hooks.set_error(&err.to_string());
        return;
    }

    let voter = match user_id {
        Some(id) => VoterIdentity::Authenticated {
            user_id: id.to_string(),
        },
        None => VoterIdentity::Anonymous {
            name: voter_name.trim().to_string(),
            email: voter_email.trim().to_string(),
        },
    };

    let records: Vec<VoteRecord> = selected_options
        .iter()
        .map(|&option_id| VoteRecord::new(poll_id, option_id, voter.clone()))
        .collect();

    hooks.set_submitting(true);

    let results = join_all(records.iter().map(|record| store.submit_vote(record))).await;

    match first_error(results) {
        Some(err) => {
            tracing::error!("vote submission failed: {err}");
            hooks.set_error(&err.to_string());
            hooks.set_submitting(false);
        }
        None => {
            hooks.set_success(true);
            hooks.set_submitting(false);
            sleep(REFRESH_DELAY).await;
            hooks.refresh();
        }
    }
}

fn validate_submission(
    selected_options: &[Uuid],
    user_id: Option<&str>,
    voter_email: &str,
    voter_name: &str,
) -> Result<(), SubmitError> {
    if selected_options.is_empty() {
        return Err(SubmitError::EmptySelection);
    }
    if user_id.is_none() && (voter_email.trim().is_empty() || voter_name.trim().is_empty()) {
        return Err(SubmitError::MissingIdentity);
    }
    Ok(())
}

fn first_error(results: Vec<Result<Vote, StoreError>>) -> Option<SubmitError> {
    results.into_iter().find_map(Result::err).map(|err| {
        if err.0.trim().is_empty() {
            SubmitError::Unexpected
        } else {
            SubmitError::Store(err.0)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Mutex;

    struct FakeStore {
        submitted: Mutex<Vec<VoteRecord>>,
        failures: Vec<(Uuid, String)>,
    }

    impl FakeStore {
        fn new() -> Self {
            Self {
                submitted: Mutex::new(Vec::new()),
                failures: Vec::new(),
            }
        }

        fn failing_on(failures: Vec<(Uuid, String)>) -> Self {
            Self {
                submitted: Mutex::new(Vec::new()),
                failures,
            }
        }

        fn submitted(&self) -> Vec<VoteRecord> {
            self.submitted.lock().unwrap().clone()
        }
    }

    impl VoteStore for FakeStore {
        async fn submit_vote(&self, record: &VoteRecord) -> Result<Vote, StoreError> {
            self.submitted.lock().unwrap().push(record.clone());
            if let Some((_, message)) = self
                .failures
                .iter()
                .find(|(option_id, _)| *option_id == record.option_id)
            {
                return Err(StoreError::new(message.clone()));
            }
            let (user_id, voter_email, voter_name) = record.voter.as_columns();
            Ok(Vote {
                id: Uuid::new_v4(),
                poll_id: record.poll_id,
                option_id: record.option_id,
                user_id: user_id.map(str::to_string),
                voter_email: voter_email.map(str::to_string),
                voter_name: voter_name.map(str::to_string),
                created_at: Utc::now(),
            })
        }
    }

    #[derive(Default)]
    struct RecordingHooks {
        errors: Vec<String>,
        success: Vec<bool>,
        submitting: Vec<bool>,
        refreshes: usize,
    }

    impl SubmitHooks for RecordingHooks {
        fn set_error(&mut self, message: &str) {
            self.errors.push(message.to_string());
        }

        fn set_success(&mut self, success: bool) {
            self.success.push(success);
        }

        fn set_submitting(&mut self, submitting: bool) {
            self.submitting.push(submitting);
        }

        fn refresh(&mut self) {
            self.refreshes += 1;
        }
    }

    #[tokio::test]
    async fn empty_selection_never_reaches_the_store() {
        let store = FakeStore::new();
        let mut hooks = RecordingHooks::default();

        handle_submit_vote(
            &store,
            &mut hooks,
            &[],
            Uuid::new_v4(),
            Some("user-1"),
            "",
            "",
        )
        .await;

        assert!(store.submitted().is_empty());
        assert_eq!(
            hooks.errors.last().map(String::as_str),
            Some("Please select at least one option")
        );
        assert!(hooks.submitting.is_empty());
        assert_eq!(hooks.refreshes, 0);
    }

    #[tokio::test]
    async fn anonymous_without_email_never_reaches_the_store() {
        let store = FakeStore::new();
        let mut hooks = RecordingHooks::default();

        handle_submit_vote(
            &store,
            &mut hooks,
            &[Uuid::new_v4()],
            Uuid::new_v4(),
            None,
            "",
            "Ada",
        )
        .await;

        assert!(store.submitted().is_empty());
        assert_eq!(
            hooks.errors.last().map(String::as_str),
            Some("Please provide your name and email for anonymous voting")
        );
    }

    #[tokio::test]
    async fn anonymous_without_name_never_reaches_the_store() {
        let store = FakeStore::new();
        let mut hooks = RecordingHooks::default();

        handle_submit_vote(
            &store,
            &mut hooks,
            &[Uuid::new_v4()],
            Uuid::new_v4(),
            None,
            "ada@example.com",
            "  ",
        )
        .await;

        assert!(store.submitted().is_empty());
        assert_eq!(
            hooks.errors.last().map(String::as_str),
            Some("Please provide your name and email for anonymous voting")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn two_options_submit_two_writes_then_refresh() {
        let store = FakeStore::new();
        let mut hooks = RecordingHooks::default();
        let poll_id = Uuid::new_v4();
        let selection = [Uuid::new_v4(), Uuid::new_v4()];

        handle_submit_vote(
            &store,
            &mut hooks,
            &selection,
            poll_id,
            Some("user-1"),
            "",
            "",
        )
        .await;

        let submitted = store.submitted();
        assert_eq!(submitted.len(), 2);
        assert!(submitted.iter().all(|record| {
            record.poll_id == poll_id
                && record.voter
                    == VoterIdentity::Authenticated {
                        user_id: "user-1".to_string(),
                    }
        }));
        assert_eq!(hooks.success, vec![false, true]);
        assert_eq!(hooks.submitting, vec![true, false]);
        assert_eq!(hooks.refreshes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn anonymous_submission_carries_name_and_email() {
        let store = FakeStore::new();
        let mut hooks = RecordingHooks::default();

        handle_submit_vote(
            &store,
            &mut hooks,
            &[Uuid::new_v4()],
            Uuid::new_v4(),
            None,
            " ada@example.com ",
            " Ada ",
        )
        .await;

        let submitted = store.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(
            submitted[0].voter,
            VoterIdentity::Anonymous {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
            }
        );
        assert_eq!(hooks.refreshes, 1);
    }

    #[tokio::test]
    async fn first_failure_wins_but_every_write_is_attempted() {
        let options = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let store = FakeStore::failing_on(vec![(options[1], "duplicate vote".to_string())]);
        let mut hooks = RecordingHooks::default();

        handle_submit_vote(
            &store,
            &mut hooks,
            &options,
            Uuid::new_v4(),
            Some("user-1"),
            "",
            "",
        )
        .await;

        assert_eq!(store.submitted().len(), 3);
        assert_eq!(hooks.errors.last().map(String::as_str), Some("duplicate vote"));
        assert_eq!(hooks.success, vec![false]);
        assert_eq!(hooks.submitting, vec![true, false]);
        assert_eq!(hooks.refreshes, 0);
    }

    #[tokio::test]
    async fn blank_store_failure_becomes_the_generic_message() {
        let option = Uuid::new_v4();
        let store = FakeStore::failing_on(vec![(option, "  ".to_string())]);
        let mut hooks = RecordingHooks::default();

        handle_submit_vote(
            &store,
            &mut hooks,
            &[option],
            Uuid::new_v4(),
            Some("user-1"),
            "",
            "",
        )
        .await;

        assert_eq!(
            hooks.errors.last().map(String::as_str),
            Some("Failed to submit vote")
        );
    }
}
