//! Session API endpoints.
//!
//! - POST `/` - Login with username-or-email and password
//! - DELETE `/` - Logout: revoke the presented refresh token, clear cookies

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse},
    routing::{delete, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::{ApiError, ResultExt};
use crate::auth::{
    ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME, build_auth_cookie, build_clear_cookie, get_cookie,
};
use crate::db::{Database, User};
use crate::impl_has_auth_state;
use crate::jwt::JwtConfig;
use crate::password::verify_password;
use crate::rate_limit::{RateLimitConfig, rate_limit_login};

#[derive(Clone)]
pub struct SessionsState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub secure_cookies: bool,
    pub rate_limits: RateLimitConfig,
}

impl_has_auth_state!(SessionsState);

pub fn router(state: SessionsState) -> Router {
    let rate_limits = Arc::new(state.rate_limits.clone());

    let login_router = Router::new()
        .route("/", post(login))
        .with_state(state.clone())
        .layer(axum::middleware::from_fn_with_state(
            rate_limits,
            rate_limit_login,
        ));

    let logout_router = Router::new()
        .route("/", delete(logout))
        .with_state(state);

    login_router.merge(logout_router)
}

/// Issue a fresh access/refresh pair for a user, record the refresh JTI,
/// and return the two Set-Cookie values. Shared by login and signup.
pub(super) async fn issue_session_cookies(
    db: &Database,
    jwt: &JwtConfig,
    secure_cookies: bool,
    user: &User,
) -> Result<(String, String), ApiError> {
    let access = jwt
        .generate_access_token(&user.uuid, &user.username, user.role)
        .map_err(|e| {
            tracing::error!("Failed to generate access token: {}", e);
            ApiError::internal("Failed to generate token")
        })?;

    let refresh = jwt
        .generate_refresh_token(&user.uuid, &user.username, user.role)
        .map_err(|e| {
            tracing::error!("Failed to generate refresh token: {}", e);
            ApiError::internal("Failed to generate token")
        })?;

    db.tokens()
        .create(&refresh.jti, user.id, refresh.issued_at, refresh.expires_at)
        .await
        .db_err("Failed to store refresh token")?;

    let access_cookie = build_auth_cookie(
        ACCESS_COOKIE_NAME,
        &access.token,
        access.duration,
        secure_cookies,
    );
    let refresh_cookie = build_auth_cookie(
        REFRESH_COOKIE_NAME,
        &refresh.token,
        refresh.duration,
        secure_cookies,
    );

    Ok((access_cookie, refresh_cookie))
}

#[derive(Deserialize)]
struct LoginRequest {
    /// Username or email address
    identifier: String,
    password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    uuid: String,
    username: String,
    display_name: String,
}

/// Login with username-or-email and password.
/// Unknown users, wrong passwords, and closed accounts are indistinguishable.
async fn login(
    State(state): State<SessionsState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let identifier = payload.identifier.trim();
    if identifier.is_empty() || payload.password.is_empty() {
        return Err(ApiError::bad_request("Missing credentials"));
    }

    let user = state
        .db
        .users()
        .get_by_identifier(identifier)
        .await
        .db_err("Failed to look up user")?;

    let Some(user) = user else {
        return Err(ApiError::unauthorized("Invalid credentials"));
    };

    if !verify_password(&payload.password, &user.password_hash) || !user.active {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let (access_cookie, refresh_cookie) =
        issue_session_cookies(&state.db, &state.jwt, state.secure_cookies, &user).await?;

    Ok((
        StatusCode::OK,
        AppendHeaders([(SET_COOKIE, access_cookie), (SET_COOKIE, refresh_cookie)]),
        Json(LoginResponse {
            uuid: user.uuid,
            username: user.username,
            display_name: user.display_name,
        }),
    ))
}

/// Logout - revoke the presented refresh token and clear both cookies.
/// Always succeeds; a missing or already-revoked token is not an error.
async fn logout(
    State(state): State<SessionsState>,
    request: axum::extract::Request,
) -> Result<impl IntoResponse, ApiError> {
    let (parts, _body) = request.into_parts();

    if let Some(refresh_token) = get_cookie(&parts.headers, REFRESH_COOKIE_NAME) {
        if let Ok(claims) = state.jwt.validate_refresh_token(refresh_token) {
            let _ = state.db.tokens().delete_by_jti(&claims.jti).await;
        }
    }

    let clear_access = build_clear_cookie(ACCESS_COOKIE_NAME, state.secure_cookies);
    let clear_refresh = build_clear_cookie(REFRESH_COOKIE_NAME, state.secure_cookies);

    Ok((
        StatusCode::OK,
        AppendHeaders([(SET_COOKIE, clear_access), (SET_COOKIE, clear_refresh)]),
        Json(serde_json::json!({ "success": true })),
    ))
}
