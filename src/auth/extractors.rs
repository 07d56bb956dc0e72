//! Axum extractors implementing the request-time authentication flow.
//!
//! The flow over the cookie pair:
//!
//! 1. A valid access token resolves the user directly.
//! 2. A missing or invalid access token falls through to the refresh path:
//!    the refresh token must verify AND its JTI must still be present in
//!    the refresh_tokens table. On success a new access token is minted and
//!    staged as a Set-Cookie for the response middleware.
//! 3. Closed accounts and revoked tokens are rejected with cleared cookies;
//!    storage failures are 500s that leave cookies alone.

use std::cell::RefCell;

use axum::{
    extract::{FromRequestParts, Request},
    http::{HeaderValue, header, request::Parts},
    middleware::Next,
    response::Response,
};

use super::cookie::{
    ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME, build_auth_cookie, get_cookie,
};
use super::errors::{ApiAuthError, AuthErrorKind};
use super::state::HasAuthState;
use super::types::AuthenticatedUser;
use crate::db::User;

tokio::task_local! {
    /// Task-local slot for the access token cookie minted during a refresh.
    /// Written by the extractor, drained by `add_access_token_cookie`.
    pub static NEW_ACCESS_TOKEN_COOKIE: RefCell<Option<String>>;
}

/// Load the user for a token subject and check the account is still open.
async fn load_active_user<S>(state: &S, uuid: &str) -> Result<User, AuthErrorKind>
where
    S: HasAuthState + Send + Sync,
{
    let user = state
        .db()
        .users()
        .get_by_uuid(uuid)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get user: {}", e);
            AuthErrorKind::Internal
        })?
        .ok_or(AuthErrorKind::Revoked)?;

    if !user.active {
        return Err(AuthErrorKind::AccountInactive);
    }

    Ok(user)
}

/// Core authentication logic shared by the extractors.
async fn authenticate_request<S>(
    parts: &Parts,
    state: &S,
) -> Result<AuthenticatedUser, AuthErrorKind>
where
    S: HasAuthState + Send + Sync,
{
    // Try to validate the access token first
    if let Some(access_token) = get_cookie(&parts.headers, ACCESS_COOKIE_NAME) {
        if let Ok(claims) = state.jwt().validate_access_token(access_token) {
            let user = load_active_user(state, &claims.sub).await?;
            return Ok(AuthenticatedUser {
                claims,
                user_id: user.id,
            });
        }
    }

    // Access token missing or invalid - try the refresh token
    let refresh_token =
        get_cookie(&parts.headers, REFRESH_COOKIE_NAME).ok_or(AuthErrorKind::Unauthenticated)?;

    // Expired, malformed, and bad-signature tokens are indistinguishable here
    let refresh_claims = state
        .jwt()
        .validate_refresh_token(refresh_token)
        .map_err(|_| AuthErrorKind::Expired)?;

    // A well-formed refresh token is honored only while its JTI is still in
    // the user's stored token list
    state
        .db()
        .tokens()
        .get_by_jti(&refresh_claims.jti)
        .await
        .map_err(|e| {
            tracing::error!("Failed to check token: {}", e);
            AuthErrorKind::Internal
        })?
        .ok_or(AuthErrorKind::Revoked)?;

    let user = load_active_user(state, &refresh_claims.sub).await?;

    // Mint a new access token for the rest of this session window
    let access_result = state
        .jwt()
        .generate_access_token(&user.uuid, &user.username, user.role)
        .map_err(|e| {
            tracing::error!("Failed to generate access token: {}", e);
            AuthErrorKind::Internal
        })?;

    let new_cookie = build_auth_cookie(
        ACCESS_COOKIE_NAME,
        &access_result.token,
        access_result.duration,
        state.secure_cookies(),
    );
    let _ = NEW_ACCESS_TOKEN_COOKIE.try_with(|cell| {
        cell.borrow_mut().replace(new_cookie);
    });

    let claims = state
        .jwt()
        .validate_access_token(&access_result.token)
        .map_err(|_| AuthErrorKind::Internal)?;

    Ok(AuthenticatedUser {
        claims,
        user_id: user.id,
    })
}

/// Extractor for API endpoints that require authentication.
/// Validates the access token; if expired, attempts the refresh path.
pub struct ApiAuth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for ApiAuth
where
    S: HasAuthState + Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authenticate_request(parts, state)
            .await
            .map(ApiAuth)
            .map_err(|kind| ApiAuthError::new(kind, state.secure_cookies()))
    }
}

/// Extractor for endpoints where authentication is optional.
///
/// A request carrying neither auth cookie continues unauthenticated with
/// `None` and can never be rejected for lack of credentials. A request
/// that does present credentials goes through the full flow, so stale or
/// revoked cookies are still surfaced (and cleared) on optional routes.
pub struct OptionalAuth(pub Option<AuthenticatedUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: HasAuthState + Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let has_access = get_cookie(&parts.headers, ACCESS_COOKIE_NAME).is_some();
        let has_refresh = get_cookie(&parts.headers, REFRESH_COOKIE_NAME).is_some();

        if !has_access && !has_refresh {
            return Ok(OptionalAuth(None));
        }

        authenticate_request(parts, state)
            .await
            .map(|user| OptionalAuth(Some(user)))
            .map_err(|kind| ApiAuthError::new(kind, state.secure_cookies()))
    }
}

/// Response middleware that appends the access token cookie staged by the
/// auth extractors during a transparent refresh.
///
/// Must be layered over every router whose handlers use the extractors,
/// since it also provides the task-local scope they write into.
pub async fn add_access_token_cookie(request: Request, next: Next) -> Response {
    NEW_ACCESS_TOKEN_COOKIE
        .scope(RefCell::new(None), async move {
            let mut response = next.run(request).await;

            let new_cookie = NEW_ACCESS_TOKEN_COOKIE.with(|cell| cell.borrow_mut().take());
            if let Some(cookie) = new_cookie {
                if let Ok(value) = HeaderValue::from_str(&cookie) {
                    response.headers_mut().append(header::SET_COOKIE, value);
                }
            }

            response
        })
        .await
}
