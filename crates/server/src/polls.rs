use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use chrono::Utc;
use pollboard_core::{
    BoardStats, NewPoll, Poll, PollOption, PollPage, PollWithOptions, validate_new_poll,
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::{ListQuery, OptionCountRow, OptionRow, PollRow, UpdatePollRequest};
use crate::{AppError, AppState, optional_user, verify_jwt};

const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 50;

const POLL_COLUMNS: &str = "id, title, description, created_by, created_at, expires_at, \
                            is_active, allow_multiple_votes, is_public";

// ===== Handlers =====

pub async fn create_poll(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(draft): Json<NewPoll>,
) -> Result<(StatusCode, Json<PollWithOptions>), AppError> {
    let user_id = verify_jwt(&state.jwks_cache, &headers).await?;

    validate_new_poll(&draft, Utc::now()).map_err(|err| AppError::BadRequest(err.to_string()))?;

    let mut tx = state.db.begin().await?;

    let poll: PollRow = sqlx::query_as(
        "INSERT INTO polls (title, description, created_by, expires_at, allow_multiple_votes, is_public)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING id, title, description, created_by, created_at, expires_at,
                   is_active, allow_multiple_votes, is_public",
    )
    .bind(draft.title.trim())
    .bind(draft.description.as_deref())
    .bind(&user_id)
    .bind(draft.expires_at)
    .bind(draft.allow_multiple_votes)
    .bind(draft.is_public)
    .fetch_one(&mut *tx)
    .await?;

    let mut options = Vec::with_capacity(draft.options.len());
    for text in &draft.options {
        let option: OptionRow = sqlx::query_as(
            "INSERT INTO poll_options (poll_id, text) VALUES ($1, $2)
             RETURNING id, poll_id, text, created_at",
        )
        .bind(poll.id)
        .bind(text.trim())
        .fetch_one(&mut *tx)
        .await?;
        options.push(PollOption::from(option).with_votes(0));
    }

    tx.commit().await?;

    tracing::info!("poll {} created by {user_id}", poll.id);
    Ok((
        StatusCode::CREATED,
        Json(PollWithOptions {
            poll: poll.into(),
            options,
        }),
    ))
}

pub async fn list_polls(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<PollPage>, AppError> {
    let user_id = optional_user(&state.jwks_cache, &headers).await?;
    let filter = PollFilter::parse(query.filter.as_deref().unwrap_or("all"));
    let search = query.search.unwrap_or_default().trim().to_string();
    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = (page - 1) * limit;

    let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM polls");
    push_list_filters(&mut count_query, user_id.as_deref(), &search, filter);
    let count: i64 = count_query
        .build_query_scalar()
        .fetch_one(&state.db)
        .await?;

    let mut page_query =
        QueryBuilder::<Postgres>::new(format!("SELECT {POLL_COLUMNS} FROM polls"));
    push_list_filters(&mut page_query, user_id.as_deref(), &search, filter);
    page_query
        .push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    let rows: Vec<PollRow> = page_query.build_query_as().fetch_all(&state.db).await?;

    let total_pages = if count == 0 { 0 } else { (count + limit - 1) / limit };

    Ok(Json(PollPage {
        data: rows.into_iter().map(Into::into).collect(),
        count,
        page,
        limit,
        total_pages,
    }))
}

pub async fn get_poll(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<PollWithOptions>, AppError> {
    let user_id = optional_user(&state.jwks_cache, &headers).await?;

    let poll = fetch_poll(&state.db, id).await?;
    // Private polls are indistinguishable from missing ones for everyone
    // but their creator.
    if !poll.is_public && user_id.as_deref() != Some(poll.created_by.as_str()) {
        return Err(AppError::NotFound("Poll not found".into()));
    }

    let options = fetch_option_counts(&state.db, id).await?;

    Ok(Json(PollWithOptions { poll, options }))
}

pub async fn update_poll(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(update): Json<UpdatePollRequest>,
) -> Result<Json<Poll>, AppError> {
    let user_id = verify_jwt(&state.jwks_cache, &headers).await?;
    ensure_owner(&state.db, id, &user_id).await?;

    if update.title.trim().is_empty() {
        return Err(AppError::BadRequest("Poll title is required".into()));
    }

    let row: PollRow = sqlx::query_as(
        "UPDATE polls
         SET title = $1, description = $2, expires_at = $3,
             is_active = $4, allow_multiple_votes = $5, is_public = $6
         WHERE id = $7
         RETURNING id, title, description, created_by, created_at, expires_at,
                   is_active, allow_multiple_votes, is_public",
    )
    .bind(update.title.trim())
    .bind(update.description.as_deref())
    .bind(update.expires_at)
    .bind(update.is_active)
    .bind(update.allow_multiple_votes)
    .bind(update.is_public)
    .bind(id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(row.into()))
}

pub async fn delete_poll(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let user_id = verify_jwt(&state.jwks_cache, &headers).await?;
    ensure_owner(&state.db, id, &user_id).await?;

    // Options and votes go with the poll via ON DELETE CASCADE.
    sqlx::query("DELETE FROM polls WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    tracing::info!("poll {id} deleted by {user_id}");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn board_stats(State(state): State<AppState>) -> Result<Json<BoardStats>, AppError> {
    let total_polls: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM polls")
        .fetch_one(&state.db)
        .await?;

    let active_polls: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM polls
         WHERE is_active AND (expires_at IS NULL OR expires_at > NOW())",
    )
    .fetch_one(&state.db)
    .await?;

    let total_votes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM votes")
        .fetch_one(&state.db)
        .await?;

    Ok(Json(BoardStats {
        total_polls,
        active_polls,
        total_votes,
    }))
}

// ===== Shared Queries =====

pub async fn fetch_poll(db: &PgPool, id: Uuid) -> Result<Poll, AppError> {
    let row: Option<PollRow> =
        sqlx::query_as(&format!("SELECT {POLL_COLUMNS} FROM polls WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await?;

    row.map(Into::into)
        .ok_or_else(|| AppError::NotFound("Poll not found".into()))
}

pub async fn fetch_option_counts(
    db: &PgPool,
    poll_id: Uuid,
) -> Result<Vec<pollboard_core::OptionResult>, AppError> {
    let rows: Vec<OptionCountRow> = sqlx::query_as(
        "SELECT o.id, o.poll_id, o.text, o.created_at, COUNT(v.id) AS vote_count
         FROM poll_options o
         LEFT JOIN votes v ON v.option_id = o.id
         WHERE o.poll_id = $1
         GROUP BY o.id, o.poll_id, o.text, o.created_at
         ORDER BY o.created_at, o.id",
    )
    .bind(poll_id)
    .fetch_all(db)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn ensure_owner(db: &PgPool, poll_id: Uuid, user_id: &str) -> Result<(), AppError> {
    let created_by: Option<String> =
        sqlx::query_scalar("SELECT created_by FROM polls WHERE id = $1")
            .bind(poll_id)
            .fetch_optional(db)
            .await?;

    match created_by {
        None => Err(AppError::NotFound("Poll not found".into())),
        Some(owner) if owner != user_id => Err(AppError::Forbidden(
            "Only the poll creator can do that".into(),
        )),
        Some(_) => Ok(()),
    }
}

// ===== Listing Filters =====

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollFilter {
    All,
    Active,
    Closed,
    Mine,
}

impl PollFilter {
    pub fn parse(value: &str) -> Self {
        match value {
            "active" => PollFilter::Active,
            "closed" => PollFilter::Closed,
            "my-polls" => PollFilter::Mine,
            _ => PollFilter::All,
        }
    }
}

fn push_list_filters(
    query: &mut QueryBuilder<'_, Postgres>,
    user_id: Option<&str>,
    search: &str,
    filter: PollFilter,
) {
    // Anonymous callers see public polls; signed-in callers also see their own.
    match user_id {
        Some(user) => {
            query
                .push(" WHERE (is_public OR created_by = ")
                .push_bind(user.to_string())
                .push(")");
        }
        None => {
            query.push(" WHERE is_public");
        }
    }

    if !search.is_empty() {
        let pattern = format!("%{search}%");
        query
            .push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    match filter {
        PollFilter::All => {}
        PollFilter::Active => {
            query.push(" AND is_active AND (expires_at IS NULL OR expires_at > NOW())");
        }
        PollFilter::Closed => {
            query.push(" AND (NOT is_active OR (expires_at IS NOT NULL AND expires_at <= NOW()))");
        }
        PollFilter::Mine => {
            if let Some(user) = user_id {
                query.push(" AND created_by = ").push_bind(user.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_parsing() {
        assert_eq!(PollFilter::parse("active"), PollFilter::Active);
        assert_eq!(PollFilter::parse("closed"), PollFilter::Closed);
        assert_eq!(PollFilter::parse("my-polls"), PollFilter::Mine);
        assert_eq!(PollFilter::parse("all"), PollFilter::All);
        assert_eq!(PollFilter::parse("garbage"), PollFilter::All);
        assert_eq!(PollFilter::parse(""), PollFilter::All);
    }

    #[test]
    fn anonymous_listing_is_public_only() {
        let mut query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM polls");
        push_list_filters(&mut query, None, "", PollFilter::Active);
        assert_eq!(
            query.sql(),
            "SELECT COUNT(*) FROM polls WHERE is_public \
             AND is_active AND (expires_at IS NULL OR expires_at > NOW())"
        );
    }

    #[test]
    fn my_polls_without_a_user_adds_no_owner_clause() {
        let mut query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM polls");
        push_list_filters(&mut query, None, "", PollFilter::Mine);
        assert_eq!(query.sql(), "SELECT COUNT(*) FROM polls WHERE is_public");
    }

    #[test]
    fn search_matches_title_and_description() {
        let mut query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM polls");
        push_list_filters(&mut query, Some("user-1"), "lunch", PollFilter::All);
        assert_eq!(
            query.sql(),
            "SELECT COUNT(*) FROM polls WHERE (is_public OR created_by = $1) \
             AND (title ILIKE $2 OR description ILIKE $3)"
        );
    }
}
