mod common;

use common::*;
use reqwest::header::COOKIE;

#[tokio::test]
async fn test_search_matches_username_and_display_name() {
    let ctx = setup().await;
    signup(&ctx, "alice").await;
    signup(&ctx, "malice").await;
    signup(&ctx, "bob").await;

    // Give bob a matching display name
    let bob = ctx.db.users().get_by_username("bob").await.unwrap().unwrap();
    sqlx::query("UPDATE users SET display_name = 'Alice Cooper' WHERE id = ?")
        .bind(bob.id)
        .execute(ctx.db.pool())
        .await
        .unwrap();

    let response = ctx
        .client
        .get(ctx.url("/api/search/users?q=alice"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    let names: Vec<&str> = body["members"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["username"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"alice"));
    assert!(names.contains(&"malice"));
    assert!(names.contains(&"bob"));
}

#[tokio::test]
async fn test_search_excludes_closed_accounts() {
    let ctx = setup().await;
    let session = signup(&ctx, "alice").await;

    let user = ctx.db.users().get_by_uuid(&session.uuid).await.unwrap().unwrap();
    ctx.db.users().close(user.id).await.unwrap();

    let response = ctx
        .client
        .get(ctx.url("/api/search/users?q=alice"))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["members"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_search_like_wildcards_are_literal() {
    let ctx = setup().await;
    signup(&ctx, "alice").await;

    // "%" would match everything if passed through unescaped
    let response = ctx
        .client
        .get(ctx.url("/api/search/users?q=%25"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["members"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_query_rejected() {
    let ctx = setup().await;

    let response = ctx
        .client
        .get(ctx.url("/api/search/users?q="))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_authenticated_search_records_history() {
    let ctx = setup().await;
    let session = signup(&ctx, "alice").await;

    let response =
        get_with_cookies(&ctx, "/api/search/users?q=rustaceans", &session.cookies()).await;
    assert_eq!(response.status(), 200);

    let response = get_with_cookies(&ctx, "/api/search/history", &session.cookies()).await;
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    let entries = body["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["query"], "rustaceans");
}

#[tokio::test]
async fn test_anonymous_search_records_nothing() {
    let ctx = setup().await;
    let session = signup(&ctx, "alice").await;

    let response = ctx
        .client
        .get(ctx.url("/api/search/users?q=rustaceans"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = get_with_cookies(&ctx, "/api/search/history", &session.cookies()).await;
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["entries"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_repeated_search_moves_to_top() {
    let ctx = setup().await;
    let session = signup(&ctx, "alice").await;

    for q in ["first", "second", "first"] {
        let response = get_with_cookies(
            &ctx,
            &format!("/api/search/users?q={}", q),
            &session.cookies(),
        )
        .await;
        assert_eq!(response.status(), 200);
    }

    let response = get_with_cookies(&ctx, "/api/search/history", &session.cookies()).await;
    let body: serde_json::Value = response.json().await.unwrap();
    let entries = body["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["query"], "first");
    assert_eq!(entries[1]["query"], "second");
}

#[tokio::test]
async fn test_delete_history_entry_and_clear() {
    let ctx = setup().await;
    let session = signup(&ctx, "alice").await;

    for q in ["one", "two", "three"] {
        get_with_cookies(
            &ctx,
            &format!("/api/search/users?q={}", q),
            &session.cookies(),
        )
        .await;
    }

    let response = get_with_cookies(&ctx, "/api/search/history", &session.cookies()).await;
    let body: serde_json::Value = response.json().await.unwrap();
    let entries = body["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 3);
    let first_id = entries[0]["id"].as_i64().unwrap();

    let response = ctx
        .client
        .delete(ctx.url(&format!("/api/search/history/{}", first_id)))
        .header(COOKIE, session.cookies())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    // Deleting it again is a 404
    let response = ctx
        .client
        .delete(ctx.url(&format!("/api/search/history/{}", first_id)))
        .header(COOKIE, session.cookies())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    let response = ctx
        .client
        .delete(ctx.url("/api/search/history"))
        .header(COOKIE, session.cookies())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["removed"], 2);

    let response = get_with_cookies(&ctx, "/api/search/history", &session.cookies()).await;
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["entries"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_history_requires_auth() {
    let ctx = setup().await;

    let response = ctx.client.get(ctx.url("/api/search/history")).send().await.unwrap();
    assert_eq!(response.status(), 401);

    let response = ctx
        .client
        .delete(ctx.url("/api/search/history"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_search_pagination() {
    let ctx = setup().await;
    for i in 0..5 {
        signup(&ctx, &format!("member{}", i)).await;
    }

    let response = ctx
        .client
        .get(ctx.url("/api/search/users?q=member&limit=3&offset=0"))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["members"].as_array().unwrap().len(), 3);

    let response = ctx
        .client
        .get(ctx.url("/api/search/users?q=member&limit=3&offset=3"))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["members"].as_array().unwrap().len(), 2);
}
