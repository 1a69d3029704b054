//! Domain models shared by the server and the voting client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A question with a fixed set of options, owned by its creator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poll {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub allow_multiple_votes: bool,
    pub is_public: bool,
}

/// One selectable answer within a poll. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollOption {
    pub id: Uuid,
    pub poll_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl PollOption {
    /// Attach an aggregated vote count.
    pub fn with_votes(self, vote_count: i64) -> OptionResult {
        OptionResult {
            id: self.id,
            poll_id: self.poll_id,
            text: self.text,
            created_at: self.created_at,
            vote_count,
        }
    }
}

/// A poll option together with its aggregated vote count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionResult {
    pub id: Uuid,
    pub poll_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub vote_count: i64,
}

/// An option with its share of the total vote, as rendered by result views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionStats {
    #[serde(flatten)]
    pub option: OptionResult,
    pub percentage: i64,
}

/// Computed vote totals for one poll. Never persisted, recomputed per read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteStats {
    pub total_votes: i64,
    pub options: Vec<OptionStats>,
}

/// Who cast a vote. Exactly one identity channel, by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoterIdentity {
    Authenticated { user_id: String },
    Anonymous { name: String, email: String },
}

impl VoterIdentity {
    /// Split into the store's (user_id, voter_email, voter_name) columns.
    pub fn as_columns(&self) -> (Option<&str>, Option<&str>, Option<&str>) {
        match self {
            VoterIdentity::Authenticated { user_id } => (Some(user_id), None, None),
            VoterIdentity::Anonymous { name, email } => (None, Some(email), Some(name)),
        }
    }
}

/// One pending vote write: a single (voter, option) selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteRecord {
    pub poll_id: Uuid,
    pub option_id: Uuid,
    pub voter: VoterIdentity,
}

impl VoteRecord {
    pub fn new(poll_id: Uuid, option_id: Uuid, voter: VoterIdentity) -> Self {
        Self {
            poll_id,
            option_id,
            voter,
        }
    }
}

/// A persisted vote row. Exactly one of `user_id` and the
/// `voter_email`/`voter_name` pair is populated; the store's check
/// constraint backs this up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub id: Uuid,
    pub poll_id: Uuid,
    pub option_id: Uuid,
    pub user_id: Option<String>,
    pub voter_email: Option<String>,
    pub voter_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a poll with its options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPoll {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub options: Vec<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub allow_multiple_votes: bool,
    #[serde(default = "default_is_public")]
    pub is_public: bool,
}

fn default_is_public() -> bool {
    true
}

/// A poll with its options and their current vote counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollWithOptions {
    #[serde(flatten)]
    pub poll: Poll,
    pub options: Vec<OptionResult>,
}

/// One page of a poll listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollPage {
    pub data: Vec<Poll>,
    pub count: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

/// Board-wide counters for the landing view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardStats {
    pub total_polls: i64,
    pub active_polls: i64,
    pub total_votes: i64,
}
