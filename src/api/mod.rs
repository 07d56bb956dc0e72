mod error;
mod follows;
mod profiles;
mod search;
mod sessions;
mod tokens;
mod users;

use axum::Router;
use serde::Deserialize;
use std::sync::Arc;

use crate::db::Database;
use crate::jwt::JwtConfig;
use crate::rate_limit::RateLimitConfig;

/// Common pagination query parameters with clamped defaults.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Pagination {
    pub const DEFAULT_LIMIT: i64 = 20;
    pub const MAX_LIMIT: i64 = 100;

    /// Resolve to a concrete (limit, offset) pair.
    pub fn clamp(&self) -> (i64, i64) {
        let limit = self
            .limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

/// Create the API router.
pub fn create_api_router(
    db: Database,
    jwt: Arc<JwtConfig>,
    secure_cookies: bool,
    no_signup: bool,
    rate_limits: RateLimitConfig,
) -> Router {
    let users_state = users::UsersState {
        db: db.clone(),
        jwt: jwt.clone(),
        secure_cookies,
        no_signup,
        rate_limits: rate_limits.clone(),
    };

    let sessions_state = sessions::SessionsState {
        db: db.clone(),
        jwt: jwt.clone(),
        secure_cookies,
        rate_limits,
    };

    let tokens_state = tokens::TokensState {
        db: db.clone(),
        jwt: jwt.clone(),
        secure_cookies,
    };

    let profiles_state = profiles::ProfilesState {
        db: db.clone(),
        jwt: jwt.clone(),
        secure_cookies,
    };

    let follows_state = follows::FollowsState {
        db: db.clone(),
        jwt: jwt.clone(),
        secure_cookies,
    };

    let search_state = search::SearchState {
        db,
        jwt,
        secure_cookies,
    };

    Router::new()
        .nest("/users", users::router(users_state))
        .nest("/sessions", sessions::router(sessions_state))
        .nest("/tokens", tokens::router(tokens_state))
        .nest("/profiles", profiles::router(profiles_state))
        .nest("/follows", follows::router(follows_state))
        .nest("/search", search::router(search_state))
}
