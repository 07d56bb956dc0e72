use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header::SET_COOKIE},
    middleware,
    response::{AppendHeaders, IntoResponse},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::{ApiError, ResultExt, validate_uuid};
use super::sessions::issue_session_cookies;
use crate::auth::{
    ACCESS_COOKIE_NAME, ApiAuth, REFRESH_COOKIE_NAME, build_clear_cookie,
};
use crate::db::{Database, UserRole};
use crate::impl_has_auth_state;
use crate::jwt::JwtConfig;
use crate::password::hash_password;
use crate::rate_limit::{RateLimitConfig, rate_limit_signup};

#[derive(Clone)]
pub struct UsersState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub secure_cookies: bool,
    pub no_signup: bool,
    pub rate_limits: RateLimitConfig,
}

impl_has_auth_state!(UsersState);

pub fn router(state: UsersState) -> Router {
    let base_router = Router::new()
        .route("/me", get(current_user))
        .route("/{uuid}", delete(close_account))
        .with_state(state.clone());

    if state.no_signup {
        base_router
    } else {
        let rate_limits = Arc::new(state.rate_limits.clone());
        let signup_router = Router::new()
            .route("/", post(create_user))
            .with_state(state)
            .layer(middleware::from_fn_with_state(rate_limits, rate_limit_signup));

        base_router.merge(signup_router)
    }
}

#[derive(Deserialize)]
struct CreateUserRequest {
    username: String,
    email: String,
    password: String,
    #[serde(default)]
    display_name: String,
}

#[derive(Serialize)]
struct CreateUserResponse {
    uuid: String,
    username: String,
    display_name: String,
}

async fn create_user(
    State(state): State<UsersState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = payload.username.trim();
    let email = payload.email.trim();

    if username.is_empty() {
        return Err(ApiError::bad_request("Username cannot be empty"));
    }

    if username.len() > 32 {
        return Err(ApiError::bad_request(
            "Username cannot be longer than 32 characters",
        ));
    }

    // Only allow alphanumeric and underscores
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ApiError::bad_request(
            "Username can only contain letters, numbers, and underscores",
        ));
    }

    // "me" is a route segment, "admin" is minted at startup
    const RESERVED: &[&str] = &["me", "admin"];
    if RESERVED.iter().any(|r| username.eq_ignore_ascii_case(r)) {
        return Err(ApiError::bad_request("Username is reserved"));
    }

    if email.is_empty() || email.len() > 254 || !is_plausible_email(email) {
        return Err(ApiError::bad_request("Invalid email address"));
    }

    if payload.password.len() < 8 {
        return Err(ApiError::bad_request(
            "Password must be at least 8 characters",
        ));
    }

    if payload.password.len() > 128 {
        return Err(ApiError::bad_request("Password is too long"));
    }

    let display_name = if payload.display_name.trim().is_empty() {
        username.to_string()
    } else {
        payload.display_name.trim().to_string()
    };

    if display_name.len() > 64 {
        return Err(ApiError::bad_request("Display name is too long"));
    }

    let available = state
        .db
        .users()
        .is_username_available(username)
        .await
        .db_err("Failed to check username availability")?;
    if !available {
        return Err(ApiError::conflict("Username is already taken"));
    }

    let available = state
        .db
        .users()
        .is_email_available(email)
        .await
        .db_err("Failed to check email availability")?;
    if !available {
        return Err(ApiError::conflict("Email is already registered"));
    }

    let password_hash = hash_password(&payload.password).map_err(|e| {
        tracing::error!("Failed to hash password: {}", e);
        ApiError::internal("Failed to create user")
    })?;

    let uuid = uuid::Uuid::new_v4().to_string();
    let user_id = state
        .db
        .users()
        .create(&uuid, username, email, &password_hash, &display_name)
        .await
        .db_err("Failed to create user")?;

    state
        .db
        .profiles()
        .create_empty(user_id)
        .await
        .db_err("Failed to create profile")?;

    // A new account starts with a live session
    let user = state
        .db
        .users()
        .get_by_id(user_id)
        .await
        .db_err("Failed to load user")?
        .ok_or_else(|| ApiError::internal("Failed to load user"))?;

    let (access_cookie, refresh_cookie) =
        issue_session_cookies(&state.db, &state.jwt, state.secure_cookies, &user).await?;

    Ok((
        StatusCode::CREATED,
        AppendHeaders([(SET_COOKIE, access_cookie), (SET_COOKIE, refresh_cookie)]),
        Json(CreateUserResponse {
            uuid,
            username: username.to_string(),
            display_name,
        }),
    ))
}

#[derive(Serialize)]
struct CurrentUserResponse {
    uuid: String,
    username: String,
    email: String,
    display_name: String,
    role: UserRole,
}

async fn current_user(
    State(state): State<UsersState>,
    ApiAuth(auth): ApiAuth,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .users()
        .get_by_id(auth.user_id)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok((
        StatusCode::OK,
        Json(CurrentUserResponse {
            uuid: user.uuid,
            username: user.username,
            email: user.email,
            display_name: user.display_name,
            role: user.role,
        }),
    ))
}

/// Close an account: mark it inactive and revoke every refresh token.
/// Members can close their own account; admins can close any.
async fn close_account(
    State(state): State<UsersState>,
    ApiAuth(auth): ApiAuth,
    Path(uuid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    validate_uuid(&uuid)?;

    let user = state
        .db
        .users()
        .get_by_uuid(&uuid)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let is_self = auth.claims.sub == uuid;
    let is_admin = auth.claims.role == UserRole::Admin;
    if !is_self && !is_admin {
        return Err(ApiError::forbidden("You can only close your own account"));
    }

    state
        .db
        .users()
        .close(user.id)
        .await
        .db_err("Failed to close account")?;

    // Every session for the account ends with it
    state
        .db
        .tokens()
        .delete_all_by_user(user.id)
        .await
        .db_err("Failed to revoke tokens")?;

    if is_self {
        let clear_access = build_clear_cookie(ACCESS_COOKIE_NAME, state.secure_cookies);
        let clear_refresh = build_clear_cookie(REFRESH_COOKIE_NAME, state.secure_cookies);
        Ok((
            StatusCode::NO_CONTENT,
            AppendHeaders(vec![
                (SET_COOKIE, clear_access),
                (SET_COOKIE, clear_refresh),
            ]),
        )
            .into_response())
    } else {
        Ok(StatusCode::NO_CONTENT.into_response())
    }
}

/// Light plausibility check; real validation happens when mail is sent.
fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}
