//! Member search and search history API endpoints.
//!
//! Search is the canonical optional-auth route: anonymous callers search
//! without leaving a trace, authenticated callers get the query recorded
//! in their history.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::{ApiError, ResultExt};
use super::Pagination;
use crate::auth::{ApiAuth, OptionalAuth};
use crate::db::{Database, MemberSummary, SearchEntry};
use crate::impl_has_auth_state;
use crate::jwt::JwtConfig;

#[derive(Clone)]
pub struct SearchState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub secure_cookies: bool,
}

impl_has_auth_state!(SearchState);

pub fn router(state: SearchState) -> Router {
    Router::new()
        .route("/users", get(search_users))
        .route("/history", get(list_history))
        .route("/history", delete(clear_history))
        .route("/history/{id}", delete(delete_history_entry))
        .with_state(state)
}

#[derive(Deserialize)]
struct SearchParams {
    q: String,
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Serialize)]
struct SearchResponse {
    members: Vec<MemberSummary>,
    limit: i64,
    offset: i64,
}

async fn search_users(
    State(state): State<SearchState>,
    OptionalAuth(viewer): OptionalAuth,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let query = params.q.trim();
    if query.is_empty() {
        return Err(ApiError::bad_request("Search query cannot be empty"));
    }
    if query.len() > 100 {
        return Err(ApiError::bad_request("Search query is too long"));
    }

    let (limit, offset) = Pagination {
        limit: params.limit,
        offset: params.offset,
    }
    .clamp();

    let members = state
        .db
        .users()
        .search(query, limit, offset)
        .await
        .db_err("Failed to search")?;

    // History is best-effort; a failed write must not fail the search
    if let Some(auth) = &viewer {
        if let Err(e) = state.db.search_history().record(auth.user_id, query).await {
            tracing::warn!("Failed to record search history: {}", e);
        }
    }

    Ok((
        StatusCode::OK,
        Json(SearchResponse {
            members,
            limit,
            offset,
        }),
    ))
}

#[derive(Serialize)]
struct HistoryResponse {
    entries: Vec<SearchEntry>,
}

async fn list_history(
    State(state): State<SearchState>,
    ApiAuth(auth): ApiAuth,
) -> Result<impl IntoResponse, ApiError> {
    let entries = state
        .db
        .search_history()
        .list(auth.user_id)
        .await
        .db_err("Failed to list history")?;

    Ok((StatusCode::OK, Json(HistoryResponse { entries })))
}

async fn clear_history(
    State(state): State<SearchState>,
    ApiAuth(auth): ApiAuth,
) -> Result<impl IntoResponse, ApiError> {
    let removed = state
        .db
        .search_history()
        .clear(auth.user_id)
        .await
        .db_err("Failed to clear history")?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "removed": removed })),
    ))
}

async fn delete_history_entry(
    State(state): State<SearchState>,
    ApiAuth(auth): ApiAuth,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state
        .db
        .search_history()
        .delete(auth.user_id, id)
        .await
        .db_err("Failed to delete history entry")?;

    if !deleted {
        return Err(ApiError::not_found("History entry not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}
