//! Token management API endpoints.
//!
//! - POST `/refresh` - Exchange refresh token for new access token
//! - GET `/` - List active refresh tokens (sessions) for current user
//! - DELETE `/{jti}` - Revoke specific refresh token (own token or admin)

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header::SET_COOKIE},
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

use super::error::{ApiError, ResultExt};
use crate::auth::{
    ACCESS_COOKIE_NAME, ApiAuth, REFRESH_COOKIE_NAME, build_auth_cookie, get_cookie,
};
use crate::db::{Database, UserRole};
use crate::impl_has_auth_state;
use crate::jwt::JwtConfig;

#[derive(Clone)]
pub struct TokensState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub secure_cookies: bool,
}

impl_has_auth_state!(TokensState);

pub fn router(state: TokensState) -> Router {
    Router::new()
        .route("/", get(list_tokens))
        .route("/verify", get(verify_token))
        .route("/refresh", post(refresh_token))
        .route("/{jti}", delete(revoke_token))
        .with_state(state)
}

#[derive(Serialize)]
struct TokenInfo {
    jti: String,
    issued_at: i64,
    expires_at: i64,
}

#[derive(Serialize)]
struct ListTokensResponse {
    tokens: Vec<TokenInfo>,
}

/// Verify that the caller is authenticated.
/// Returns 200 if so, 401 if not. Lightweight auth-status probe.
async fn verify_token(ApiAuth(_auth): ApiAuth) -> impl IntoResponse {
    StatusCode::OK
}

/// Refresh the access token using a valid refresh token.
/// The refresh token must verify and its JTI must still be stored.
async fn refresh_token(
    State(state): State<TokensState>,
    request: axum::extract::Request,
) -> Result<impl IntoResponse, ApiError> {
    let (parts, _body) = request.into_parts();

    let refresh_token = get_cookie(&parts.headers, REFRESH_COOKIE_NAME)
        .ok_or_else(|| ApiError::unauthorized("No refresh token"))?;

    let claims = state
        .jwt
        .validate_refresh_token(refresh_token)
        .map_err(|_| ApiError::unauthorized("Invalid or expired refresh token"))?;

    // Membership check: a signature-valid token that has been revoked is
    // rejected here
    state
        .db
        .tokens()
        .get_by_jti(&claims.jti)
        .await
        .db_err("Failed to check token")?
        .ok_or_else(|| ApiError::unauthorized("Refresh token has been revoked"))?;

    let user = state
        .db
        .users()
        .get_by_uuid(&claims.sub)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;

    if !user.active {
        return Err(ApiError::unauthorized("Account is closed"));
    }

    let access_result = state
        .jwt
        .generate_access_token(&user.uuid, &user.username, user.role)
        .map_err(|e| {
            error!("Failed to generate access token: {}", e);
            ApiError::internal("Failed to generate token")
        })?;

    let access_cookie = build_auth_cookie(
        ACCESS_COOKIE_NAME,
        &access_result.token,
        access_result.duration,
        state.secure_cookies,
    );

    Ok((
        StatusCode::OK,
        [(SET_COOKIE, access_cookie)],
        Json(serde_json::json!({ "success": true })),
    ))
}

/// List all live refresh tokens (sessions) for the current user.
async fn list_tokens(
    State(state): State<TokensState>,
    ApiAuth(auth): ApiAuth,
) -> Result<impl IntoResponse, ApiError> {
    let tokens = state
        .db
        .tokens()
        .list_by_user(auth.user_id)
        .await
        .db_err("Failed to list tokens")?;

    let token_infos: Vec<TokenInfo> = tokens
        .into_iter()
        .map(|t| TokenInfo {
            jti: t.jti,
            issued_at: t.issued_at,
            expires_at: t.expires_at,
        })
        .collect();

    Ok((
        StatusCode::OK,
        Json(ListTokensResponse {
            tokens: token_infos,
        }),
    ))
}

#[derive(Serialize)]
struct RevokeResponse {
    revoked: bool,
}

/// Revoke a specific refresh token by JTI.
/// Users can revoke their own tokens, admins can revoke any token.
async fn revoke_token(
    State(state): State<TokensState>,
    ApiAuth(auth): ApiAuth,
    Path(jti): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let token = state
        .db
        .tokens()
        .get_by_jti(&jti)
        .await
        .db_err("Failed to get token")?;

    if let Some(token) = token {
        if token.user_id != auth.user_id && auth.claims.role != UserRole::Admin {
            return Err(ApiError::forbidden("Cannot revoke another user's token"));
        }

        let revoked = state
            .db
            .tokens()
            .delete_by_jti(&jti)
            .await
            .db_err("Failed to revoke token")?;

        Ok((StatusCode::OK, Json(RevokeResponse { revoked })))
    } else {
        // Token not found - already revoked or never existed
        Ok((StatusCode::OK, Json(RevokeResponse { revoked: false })))
    }
}
