mod common;

use common::*;
use reqwest::header::COOKIE;

#[tokio::test]
async fn test_valid_access_token_does_not_reissue() {
    let ctx = setup().await;
    let session = signup(&ctx, "alice").await;

    let response = get_with_cookies(&ctx, "/api/users/me", &session.cookies()).await;
    assert_eq!(response.status(), 200);

    // No refresh happened, so no new access cookie
    assert!(extract_cookie(&response, "accessToken").is_none());
}

#[tokio::test]
async fn test_expired_access_with_valid_refresh_reissues() {
    let ctx = setup().await;
    let session = signup(&ctx, "alice").await;

    let expired = make_expired_access_token(&session.uuid, "alice");
    let cookies = format!("accessToken={}; refreshToken={}", expired, session.refresh);

    let response = get_with_cookies(&ctx, "/api/users/me", &cookies).await;
    assert_eq!(response.status(), 200);

    // The request proceeded with the right identity
    let new_access = extract_cookie(&response, "accessToken").expect("expected reissued cookie");
    assert!(!new_access.is_empty());

    // The reissued token works on its own
    let response =
        get_with_cookies(&ctx, "/api/users/me", &format!("accessToken={}", new_access)).await;
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["username"], "alice");
}

#[tokio::test]
async fn test_refresh_only_cookie_authenticates() {
    let ctx = setup().await;
    let session = signup(&ctx, "alice").await;

    let response = get_with_cookies(&ctx, "/api/users/me", &session.refresh_only()).await;
    assert_eq!(response.status(), 200);
    assert!(extract_cookie(&response, "accessToken").is_some());
}

#[tokio::test]
async fn test_refresh_endpoint() {
    let ctx = setup().await;
    let session = signup(&ctx, "alice").await;

    let response = ctx
        .client
        .post(ctx.url("/api/tokens/refresh"))
        .header(COOKIE, session.refresh_only())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let access = extract_cookie(&response, "accessToken").unwrap();
    assert!(!access.is_empty());

    // The cookie's lifetime matches the access token TTL
    let raw = response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .find_map(|v| {
            let s = v.to_str().ok()?;
            s.starts_with("accessToken=").then(|| s.to_string())
        })
        .unwrap();
    assert!(raw.contains(&format!(
        "Max-Age={}",
        linkfolio::jwt::ACCESS_TOKEN_DURATION_SECS
    )));
}

#[tokio::test]
async fn test_refresh_endpoint_without_cookie() {
    let ctx = setup().await;

    let response = ctx
        .client
        .post(ctx.url("/api/tokens/refresh"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_unstored_refresh_token_rejected() {
    let ctx = setup().await;
    let session = signup(&ctx, "alice").await;

    // Signature-valid token whose JTI was never stored: revoked as far as
    // the server is concerned
    let unstored = make_unstored_refresh_token(&session.uuid, "alice");
    let response =
        get_with_cookies(&ctx, "/api/users/me", &format!("refreshToken={}", unstored)).await;

    assert_eq!(response.status(), 401);
    assert!(clears_cookie(&response, "accessToken"));
    assert!(clears_cookie(&response, "refreshToken"));
}

#[tokio::test]
async fn test_invalidate_then_refresh_fails() {
    let ctx = setup().await;
    let session = signup(&ctx, "alice").await;

    // Revoke the session's refresh token through the API
    let jti = refresh_jti(&session.refresh);
    let response = ctx
        .client
        .delete(ctx.url(&format!("/api/tokens/{}", jti)))
        .header(COOKIE, session.access_only())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["revoked"], true);

    // Immediately verifying it as a refresh credential fails
    let response = get_with_cookies(&ctx, "/api/users/me", &session.refresh_only()).await;
    assert_eq!(response.status(), 401);

    // Revoking again is a no-op, not an error
    let response = ctx
        .client
        .delete(ctx.url(&format!("/api/tokens/{}", jti)))
        .header(COOKIE, session.access_only())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["revoked"], false);
}

#[tokio::test]
async fn test_logout_revokes_and_clears() {
    let ctx = setup().await;
    let session = signup(&ctx, "alice").await;

    let response = ctx
        .client
        .delete(ctx.url("/api/sessions"))
        .header(COOKIE, session.cookies())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert!(clears_cookie(&response, "accessToken"));
    assert!(clears_cookie(&response, "refreshToken"));

    // The refresh token is gone from the stored list
    let response = get_with_cookies(&ctx, "/api/users/me", &session.refresh_only()).await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_logout_without_cookies_still_succeeds() {
    let ctx = setup().await;

    let response = ctx.client.delete(ctx.url("/api/sessions")).send().await.unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_list_sessions() {
    let ctx = setup().await;
    let session = signup(&ctx, "alice").await;

    // A second login adds a second session
    let response = login(&ctx, "alice").await;
    assert_eq!(response.status(), 200);

    let response = get_with_cookies(&ctx, "/api/tokens", &session.access_only()).await;
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["tokens"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_cannot_revoke_other_users_token() {
    let ctx = setup().await;
    let alice = signup(&ctx, "alice").await;
    let bob = signup(&ctx, "bob").await;

    let alice_jti = refresh_jti(&alice.refresh);
    let response = ctx
        .client
        .delete(ctx.url(&format!("/api/tokens/{}", alice_jti)))
        .header(COOKIE, bob.cookies())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 403);

    // Alice's session still works
    let response = get_with_cookies(&ctx, "/api/users/me", &alice.refresh_only()).await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_closed_account_fails_both_paths() {
    let ctx = setup().await;
    let session = signup(&ctx, "alice").await;

    // Close the account directly, leaving the refresh token row in place,
    // so both paths hit the account check rather than revocation
    let user = ctx.db.users().get_by_uuid(&session.uuid).await.unwrap().unwrap();
    ctx.db.users().close(user.id).await.unwrap();

    let via_access = get_with_cookies(&ctx, "/api/users/me", &session.access_only()).await;
    assert_eq!(via_access.status(), 401);
    assert!(clears_cookie(&via_access, "accessToken"));
    assert!(clears_cookie(&via_access, "refreshToken"));

    let via_refresh = get_with_cookies(&ctx, "/api/users/me", &session.refresh_only()).await;
    assert_eq!(via_refresh.status(), 401);
    assert!(clears_cookie(&via_refresh, "accessToken"));
    assert!(clears_cookie(&via_refresh, "refreshToken"));
}

#[tokio::test]
async fn test_verify_endpoint() {
    let ctx = setup().await;
    let session = signup(&ctx, "alice").await;

    let response = get_with_cookies(&ctx, "/api/tokens/verify", &session.access_only()).await;
    assert_eq!(response.status(), 200);

    let response = ctx.client.get(ctx.url("/api/tokens/verify")).send().await.unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_optional_route_without_cookies_never_401() {
    let ctx = setup().await;
    signup(&ctx, "alice").await;

    let response = ctx
        .client
        .get(ctx.url("/api/search/users?q=ali"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_optional_route_with_stale_credentials_rejected() {
    let ctx = setup().await;
    let session = signup(&ctx, "alice").await;

    // Log out, then present the old refresh token on an optional route:
    // credentials were presented, so the revocation is surfaced
    let response = ctx
        .client
        .delete(ctx.url("/api/sessions"))
        .header(COOKIE, session.cookies())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response =
        get_with_cookies(&ctx, "/api/search/users?q=ali", &session.refresh_only()).await;
    assert_eq!(response.status(), 401);
}
