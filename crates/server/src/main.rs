mod models;
mod polls;
mod votes;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde_json::json;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::{env, sync::Arc};
use supabase_jwt::{Claims, JwksCache};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

// ===== App State =====

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub jwks_cache: Arc<JwksCache>,
}

// ===== Auth =====

pub async fn verify_jwt(
    jwks_cache: &Arc<JwksCache>,
    headers: &HeaderMap,
) -> Result<String, AppError> {
    let auth_header = headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::BadRequest("no auth".into()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::BadRequest("no bearer".into()))?;

    match Claims::from_token(token, jwks_cache).await {
        Err(_) => Err(AppError::Unauthorized),
        Ok(claims) if Utc::now().timestamp() > claims.exp as i64 => Err(AppError::Unauthorized),
        Ok(claims) => Ok(claims.sub),
    }
}

/// No Authorization header means an anonymous caller; a header that fails
/// verification is still an error.
pub async fn optional_user(
    jwks_cache: &Arc<JwksCache>,
    headers: &HeaderMap,
) -> Result<Option<String>, AppError> {
    if headers.get("Authorization").is_none() {
        return Ok(None);
    }
    verify_jwt(jwks_cache, headers).await.map(Some)
}

// ===== Main =====

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let supabase_url = env::var("SUPABASE_URL").expect("SUPABASE_URL must be set");
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);

    let db = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    let jwks_cache = Arc::new(JwksCache::new(&format!(
        "{supabase_url}/auth/v1/.well-known/jwks.json"
    )));
    let state = AppState { db, jwks_cache };

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/me", get(me))
        .route("/polls", post(polls::create_poll).get(polls::list_polls))
        .route("/polls/stats", get(polls::board_stats))
        .route(
            "/polls/:id",
            get(polls::get_poll)
                .patch(polls::update_poll)
                .delete(polls::delete_poll),
        )
        .route("/polls/:id/vote", post(votes::submit_vote))
        .route("/polls/:id/votes", get(votes::list_poll_votes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("Server running on http://0.0.0.0:{port}");

    axum::serve(listener, app).await?;
    Ok(())
}

// ===== Basic Handlers =====

async fn root() -> &'static str {
    "Pollboard Backend (Supabase Auth) - Use /health to check status"
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => Json(json!({
            "status": "ok",
            "database": "connected"
        })),
        Err(_) => Json(json!({
            "status": "error",
            "database": "disconnected"
        })),
    }
}

async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let user_id = verify_jwt(&state.jwks_cache, &headers).await?;
    Ok(Json(json!({ "user_id": user_id })))
}

// ===== Error Handling =====

pub enum AppError {
    Unauthorized,
    Forbidden(String),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Database(sqlx::Error),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Unauthorized - Invalid or missing JWT token".to_string(),
            ),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Database(err) => {
                tracing::error!("Database error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
        };

        (status, message).into_response()
    }
}
