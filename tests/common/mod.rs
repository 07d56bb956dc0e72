#![allow(dead_code)]

use linkfolio::db::{Database, UserRole};
use linkfolio::jwt::{AccessClaims, RefreshClaims, TokenType};
use linkfolio::rate_limit::RateLimitConfig;
use linkfolio::ServerConfig;
use reqwest::header::{COOKIE, SET_COOKIE};

/// Signing secret shared by the test server and token-crafting helpers.
pub const TEST_JWT_SECRET: &[u8] = b"test-jwt-secret-for-integration-tests";

pub struct TestContext {
    pub base_url: String,
    pub db: Database,
    pub client: reqwest::Client,
    server_handle: tokio::task::JoinHandle<()>,
}

impl Drop for TestContext {
    fn drop(&mut self) {
        self.server_handle.abort();
    }
}

pub async fn setup() -> TestContext {
    setup_with_options(false).await
}

pub async fn setup_with_no_signup() -> TestContext {
    setup_with_options(true).await
}

async fn setup_with_options(no_signup: bool) -> TestContext {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");

    let config = ServerConfig {
        db: db.clone(),
        jwt_secret: TEST_JWT_SECRET.to_vec(),
        secure_cookies: false, // Tests run on localhost HTTP
        no_signup,
        rate_limits: RateLimitConfig::relaxed(),
    };

    let (server_handle, addr) = linkfolio::start_server(config, 0).await;

    TestContext {
        base_url: format!("http://{}", addr),
        db,
        client: reqwest::Client::new(),
        server_handle,
    }
}

impl TestContext {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// An established session: the cookie values and the account's identifiers.
pub struct Session {
    pub uuid: String,
    pub username: String,
    pub access: String,
    pub refresh: String,
}

impl Session {
    /// Cookie header carrying both tokens.
    pub fn cookies(&self) -> String {
        format!("accessToken={}; refreshToken={}", self.access, self.refresh)
    }

    /// Cookie header carrying only the refresh token.
    pub fn refresh_only(&self) -> String {
        format!("refreshToken={}", self.refresh)
    }

    /// Cookie header carrying only the access token.
    pub fn access_only(&self) -> String {
        format!("accessToken={}", self.access)
    }
}

/// Extract a cookie value from a response's Set-Cookie headers.
pub fn extract_cookie(response: &reqwest::Response, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    for header in response.headers().get_all(SET_COOKIE) {
        let Ok(value) = header.to_str() else { continue };
        if let Some(rest) = value.strip_prefix(&prefix) {
            let cookie_value = rest.split(';').next().unwrap_or("").to_string();
            return Some(cookie_value);
        }
    }
    None
}

/// Collect the Set-Cookie headers that clear the given cookie (Max-Age=0).
pub fn clears_cookie(response: &reqwest::Response, name: &str) -> bool {
    let prefix = format!("{}=", name);
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with(&prefix) && v.contains("Max-Age=0"))
}

/// Sign up a new user and return the established session.
pub async fn signup(ctx: &TestContext, username: &str) -> Session {
    let response = ctx
        .client
        .post(ctx.url("/api/users"))
        .json(&serde_json::json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "correct horse battery staple",
            "display_name": username,
        }))
        .send()
        .await
        .expect("signup request failed");

    assert_eq!(response.status(), 201, "signup should succeed");

    let access = extract_cookie(&response, "accessToken").expect("missing access cookie");
    let refresh = extract_cookie(&response, "refreshToken").expect("missing refresh cookie");

    let body: serde_json::Value = response.json().await.expect("invalid signup body");
    Session {
        uuid: body["uuid"].as_str().expect("missing uuid").to_string(),
        username: username.to_string(),
        access,
        refresh,
    }
}

/// Login with the default test password.
pub async fn login(ctx: &TestContext, identifier: &str) -> reqwest::Response {
    ctx.client
        .post(ctx.url("/api/sessions"))
        .json(&serde_json::json!({
            "identifier": identifier,
            "password": "correct horse battery staple",
        }))
        .send()
        .await
        .expect("login request failed")
}

/// GET a path with a Cookie header.
pub async fn get_with_cookies(
    ctx: &TestContext,
    path: &str,
    cookies: &str,
) -> reqwest::Response {
    ctx.client
        .get(ctx.url(path))
        .header(COOKIE, cookies)
        .send()
        .await
        .expect("request failed")
}

/// Craft an access token that expired in the past, signed with the test secret.
pub fn make_expired_access_token(uuid: &str, username: &str) -> String {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs();

    let claims = AccessClaims {
        sub: uuid.to_string(),
        username: username.to_string(),
        role: UserRole::User,
        token_type: TokenType::Access,
        iat: now - 3600,
        exp: now - 1800,
    };

    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(TEST_JWT_SECRET),
    )
    .expect("failed to encode token")
}

/// Craft a signature-valid, unexpired refresh token whose JTI was never
/// stored (so it must be treated as revoked).
pub fn make_unstored_refresh_token(uuid: &str, username: &str) -> String {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs();

    let claims = RefreshClaims {
        jti: uuid::Uuid::new_v4().to_string(),
        sub: uuid.to_string(),
        username: username.to_string(),
        role: UserRole::User,
        token_type: TokenType::Refresh,
        iat: now,
        exp: now + 3600,
    };

    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(TEST_JWT_SECRET),
    )
    .expect("failed to encode token")
}

/// Decode the JTI out of a refresh token cookie value.
pub fn refresh_jti(refresh_token: &str) -> String {
    linkfolio::jwt::JwtConfig::new(TEST_JWT_SECRET)
        .validate_refresh_token(refresh_token)
        .expect("invalid refresh token")
        .jti
}
