//! Follow relationship API endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde::Serialize;
use std::sync::Arc;

use super::error::{ApiError, ResultExt, validate_uuid};
use super::Pagination;
use crate::auth::ApiAuth;
use crate::db::{Database, MemberSummary, User};
use crate::impl_has_auth_state;
use crate::jwt::JwtConfig;

#[derive(Clone)]
pub struct FollowsState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub secure_cookies: bool,
}

impl_has_auth_state!(FollowsState);

pub fn router(state: FollowsState) -> Router {
    Router::new()
        .route("/{uuid}", post(follow))
        .route("/{uuid}", delete(unfollow))
        .route("/{uuid}/followers", get(list_followers))
        .route("/{uuid}/following", get(list_following))
        .with_state(state)
}

async fn resolve_member(state: &FollowsState, uuid: &str) -> Result<User, ApiError> {
    validate_uuid(uuid)?;
    state
        .db
        .users()
        .get_by_uuid(uuid)
        .await
        .db_err("Failed to get user")?
        .filter(|u| u.active)
        .ok_or_else(|| ApiError::not_found("User not found"))
}

#[derive(Serialize)]
struct FollowResponse {
    following: bool,
    changed: bool,
}

async fn follow(
    State(state): State<FollowsState>,
    ApiAuth(auth): ApiAuth,
    Path(uuid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let target = resolve_member(&state, &uuid).await?;

    if target.id == auth.user_id {
        return Err(ApiError::bad_request("Cannot follow yourself"));
    }

    let changed = state
        .db
        .follows()
        .follow(auth.user_id, target.id)
        .await
        .db_err("Failed to follow")?;

    Ok((
        StatusCode::OK,
        Json(FollowResponse {
            following: true,
            changed,
        }),
    ))
}

async fn unfollow(
    State(state): State<FollowsState>,
    ApiAuth(auth): ApiAuth,
    Path(uuid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let target = resolve_member(&state, &uuid).await?;

    let changed = state
        .db
        .follows()
        .unfollow(auth.user_id, target.id)
        .await
        .db_err("Failed to unfollow")?;

    Ok((
        StatusCode::OK,
        Json(FollowResponse {
            following: false,
            changed,
        }),
    ))
}

#[derive(Serialize)]
struct MemberListResponse {
    members: Vec<MemberSummary>,
    total: i64,
    limit: i64,
    offset: i64,
}

async fn list_followers(
    State(state): State<FollowsState>,
    Path(uuid): Path<String>,
    Query(page): Query<Pagination>,
) -> Result<impl IntoResponse, ApiError> {
    let target = resolve_member(&state, &uuid).await?;
    let (limit, offset) = page.clamp();

    let members = state
        .db
        .follows()
        .list_followers(target.id, limit, offset)
        .await
        .db_err("Failed to list followers")?;

    let total = state
        .db
        .follows()
        .count_followers(target.id)
        .await
        .db_err("Failed to count followers")?;

    Ok((
        StatusCode::OK,
        Json(MemberListResponse {
            members,
            total,
            limit,
            offset,
        }),
    ))
}

async fn list_following(
    State(state): State<FollowsState>,
    Path(uuid): Path<String>,
    Query(page): Query<Pagination>,
) -> Result<impl IntoResponse, ApiError> {
    let target = resolve_member(&state, &uuid).await?;
    let (limit, offset) = page.clamp();

    let members = state
        .db
        .follows()
        .list_following(target.id, limit, offset)
        .await
        .db_err("Failed to list following")?;

    let total = state
        .db
        .follows()
        .count_following(target.id)
        .await
        .db_err("Failed to count following")?;

    Ok((
        StatusCode::OK,
        Json(MemberListResponse {
            members,
            total,
            limit,
            offset,
        }),
    ))
}
