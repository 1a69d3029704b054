use chrono::{DateTime, Utc};
use pollboard_core::{OptionResult, Poll, PollOption, Vote};
use serde::Deserialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, FromRow)]
pub struct PollRow {
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

impl From<PollRow> for Poll {
    fn from(row: PollRow) -> Self {
        Poll {
            id: row.id,
            title: row.title,
            description: row.description,
            created_by: row.created_by,
            created_at: row.created_at,
            expires_at: row.expires_at,
            is_active: row.is_active,
            allow_multiple_votes: row.allow_multiple_votes,
            is_public: row.is_public,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct OptionRow {
    pub id: Uuid,
    pub poll_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl From<OptionRow> for PollOption {
    fn from(row: OptionRow) -> Self {
        PollOption {
            id: row.id,
            poll_id: row.poll_id,
            text: row.text,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct OptionCountRow {
    pub id: Uuid,
    pub poll_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub vote_count: i64,
}

impl From<OptionCountRow> for OptionResult {
    fn from(row: OptionCountRow) -> Self {
        OptionResult {
            id: row.id,
            poll_id: row.poll_id,
            text: row.text,
            created_at: row.created_at,
            vote_count: row.vote_count,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct VoteRow {
    pub id: Uuid,
    pub poll_id: Uuid,
    pub option_id: Uuid,
    pub user_id: Option<String>,
    pub voter_email: Option<String>,
    pub voter_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<VoteRow> for Vote {
    fn from(row: VoteRow) -> Self {
        Vote {
            id: row.id,
            poll_id: row.poll_id,
            option_id: row.option_id,
            user_id: row.user_id,
            voter_email: row.voter_email,
            voter_name: row.voter_name,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePollRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub allow_multiple_votes: bool,
    pub is_public: bool,
}

#[derive(Debug, Deserialize)]
pub struct VoteSubmitRequest {
    pub option_id: Uuid,
    #[serde(default)]
    pub voter_email: Option<String>,
    #[serde(default)]
    pub voter_name: Option<String>,
}
