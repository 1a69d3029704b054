use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};
use chrono::Utc;
use pollboard_core::{
    Vote, VoterIdentity, filter_unvoted_options, is_valid_email, validate_poll_status,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{VoteRow, VoteSubmitRequest};
use crate::polls::{ensure_owner, fetch_poll};
use crate::{AppError, AppState, optional_user, verify_jwt};

const VOTE_COLUMNS: &str =
    "id, poll_id, option_id, user_id, voter_email, voter_name, created_at";

pub async fn submit_vote(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(poll_id): Path<Uuid>,
    Json(request): Json<VoteSubmitRequest>,
) -> Result<(StatusCode, Json<Vote>), AppError> {
    let user_id = optional_user(&state.jwks_cache, &headers).await?;

    let poll = fetch_poll(&state.db, poll_id).await?;
    let status = validate_poll_status(&poll, Utc::now());
    if status.is_expired {
        return Err(AppError::BadRequest("This poll has expired".into()));
    }
    if !status.is_active {
        return Err(AppError::BadRequest(
            "This poll is no longer accepting votes".into(),
        ));
    }

    let voter = match user_id {
        Some(user_id) => VoterIdentity::Authenticated { user_id },
        None => {
            let name = request.voter_name.as_deref().unwrap_or("").trim().to_string();
            let email = request
                .voter_email
                .as_deref()
                .unwrap_or("")
                .trim()
                .to_string();
            if name.is_empty() || email.is_empty() {
                return Err(AppError::BadRequest(
                    "Please provide your name and email for anonymous voting".into(),
                ));
            }
            if !is_valid_email(&email) {
                return Err(AppError::BadRequest("Invalid email format".into()));
            }
            VoterIdentity::Anonymous { name, email }
        }
    };

    let belongs: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM poll_options WHERE id = $1 AND poll_id = $2)",
    )
    .bind(request.option_id)
    .bind(poll_id)
    .fetch_one(&state.db)
    .await?;
    if !belongs {
        return Err(AppError::BadRequest(
            "Option does not belong to this poll".into(),
        ));
    }

    let existing = fetch_voter_votes(&state.db, poll_id, &voter).await?;
    if !poll.allow_multiple_votes && !existing.is_empty() {
        return Err(AppError::Conflict(
            "You have already voted on this poll".into(),
        ));
    }
    if filter_unvoted_options(&[request.option_id], &existing).is_empty() {
        return Err(AppError::Conflict(
            "You have already voted for this option".into(),
        ));
    }

    let (vote_user, vote_email, vote_name) = voter.as_columns();
    let inserted = sqlx::query_as::<_, VoteRow>(&format!(
        "INSERT INTO votes (poll_id, option_id, user_id, voter_email, voter_name)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {VOTE_COLUMNS}"
    ))
    .bind(poll_id)
    .bind(request.option_id)
    .bind(vote_user)
    .bind(vote_email)
    .bind(vote_name)
    .fetch_one(&state.db)
    .await;

    match inserted {
        Ok(row) => Ok((StatusCode::CREATED, Json(row.into()))),
        // The check above races with concurrent submissions; the store's
        // unique indexes are authoritative.
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => Err(AppError::Conflict(
            "You have already voted for this option".into(),
        )),
        Err(err) => Err(err.into()),
    }
}

pub async fn list_poll_votes(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(poll_id): Path<Uuid>,
) -> Result<Json<Vec<Vote>>, AppError> {
    let user_id = verify_jwt(&state.jwks_cache, &headers).await?;
    ensure_owner(&state.db, poll_id, &user_id).await?;

    let rows: Vec<VoteRow> = sqlx::query_as(&format!(
        "SELECT {VOTE_COLUMNS} FROM votes WHERE poll_id = $1 ORDER BY created_at DESC"
    ))
    .bind(poll_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

async fn fetch_voter_votes(
    db: &PgPool,
    poll_id: Uuid,
    voter: &VoterIdentity,
) -> Result<Vec<Vote>, AppError> {
    let (user_id, voter_email, _) = voter.as_columns();
    let rows: Vec<VoteRow> = sqlx::query_as(&format!(
        "SELECT {VOTE_COLUMNS} FROM votes
         WHERE poll_id = $1
           AND ((user_id IS NOT NULL AND user_id = $2)
             OR (voter_email IS NOT NULL AND voter_email = $3))"
    ))
    .bind(poll_id)
    .bind(user_id)
    .bind(voter_email)
    .fetch_all(db)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}
