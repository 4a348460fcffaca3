//! Integration tests for nashir-cms API endpoints
//!
//! Tests cover:
//! - Session login/logout and password reset flow
//! - Article lifecycle: draft -> published -> archived, slug generation
//! - Role enforcement (reader/author/editor/admin)
//! - Reader feeds, category feeds, featured strip, lite feed cursor
//! - View counting with the session dedup window
//! - Curation surfaces: categories, angles, smart blocks, themes
//! - Newsroom tools: tasks, chat, dictionary, preferences
//!
//! Each test runs against its own freshly initialized database in a
//! temp directory, so tests are independent and run in parallel.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

use nashir_cms::{build_router, AppState};
use nashir_common::auth::{create_session, generate_salt, hash_password};
use nashir_common::db::init::init_database;

// ========================================
// Test Helpers
// ========================================

struct TestApp {
    app: Router,
    db: SqlitePool,
    _root: TempDir,
}

/// Create a fresh database and router in a temp directory
async fn setup() -> TestApp {
    let root = tempfile::tempdir().expect("Should create temp dir");
    let db = init_database(&root.path().join("nashir.db"))
        .await
        .expect("Should initialize database");
    let state = AppState::new(db.clone());
    TestApp {
        app: build_router(state),
        db,
        _root: root,
    }
}

/// Insert an active user with password "correct horse" and return its guid
async fn insert_user(db: &SqlitePool, username: &str, role: &str) -> String {
    let guid = uuid::Uuid::new_v4().to_string();
    let salt = generate_salt();
    let hash = hash_password("correct horse", &salt);
    sqlx::query(
        r#"
        INSERT INTO users (guid, username, email, password_hash, password_salt, display_name, role)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&guid)
    .bind(username)
    .bind(format!("{}@nashir.example", username))
    .bind(&hash)
    .bind(&salt)
    .bind(username)
    .bind(role)
    .execute(db)
    .await
    .expect("Should insert user");
    guid
}

/// Create a session for a user and return the Cookie header value
async fn cookie_for(db: &SqlitePool, user_guid: &str) -> String {
    let token = create_session(db, user_guid)
        .await
        .expect("Should create session");
    format!("nashir_session={}", token)
}

/// Shorthand: insert a user with the given role and log them in
async fn login_as(db: &SqlitePool, username: &str, role: &str) -> (String, String) {
    let guid = insert_user(db, username, role).await;
    let cookie = cookie_for(db, &guid).await;
    (guid, cookie)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn get_auth(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

fn send_json(method: &str, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn delete_auth(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

/// Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = body.collect().await.expect("Should read body").to_bytes();
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn category_guid(db: &SqlitePool, slug: &str) -> String {
    sqlx::query_scalar("SELECT guid FROM categories WHERE slug = ?")
        .bind(slug)
        .fetch_one(db)
        .await
        .expect("Should find seeded category")
}

/// Create a draft through the API and return its JSON detail
async fn create_draft(app: &Router, cookie: &str, title: &str, category_id: &str) -> Value {
    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/articles",
            Some(cookie),
            json!({
                "title": title,
                "summary": "summary",
                "body": "body text",
                "category_id": category_id,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    extract_json(response.into_body()).await
}

/// Publish a draft through the admin API and return the updated detail
async fn publish(app: &Router, cookie: &str, article_guid: &str) -> Value {
    let uri = format!("/api/admin/articles/{}/publish", article_guid);
    let response = app
        .clone()
        .oneshot(send_json("POST", &uri, Some(cookie), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    extract_json(response.into_body()).await
}

/// Percent-encode a lite feed cursor for use in a query string
fn encode_cursor(cursor: &str) -> String {
    cursor.replace('+', "%2B").replace('|', "%7C")
}

// ========================================
// Health and Build Info
// ========================================

#[tokio::test]
async fn test_health_endpoint() {
    let t = setup().await;

    let response = t.app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "nashir-cms");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_buildinfo_endpoint() {
    let t = setup().await;

    let response = t.app.oneshot(get("/api/buildinfo")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert!(body["version"].is_string());
    assert!(body["build_profile"].is_string());
}

// ========================================
// Authentication
// ========================================

#[tokio::test]
async fn test_login_sets_session_cookie() {
    let t = setup().await;
    insert_user(&t.db, "amal", "author").await;

    let response = t
        .app
        .oneshot(send_json(
            "POST",
            "/api/auth/login",
            None,
            json!({"username": "amal", "password": "correct horse"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("Should set session cookie")
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("nashir_session="));
    assert!(cookie.contains("HttpOnly"));

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["username"], "amal");
    // Credentials never leave the server
    assert!(body.get("password_hash").is_none());
    assert!(body.get("password_salt").is_none());
}

#[tokio::test]
async fn test_login_rejects_wrong_password() {
    let t = setup().await;
    insert_user(&t.db, "amal", "author").await;

    let response = t
        .app
        .oneshot(send_json(
            "POST",
            "/api/auth/login",
            None,
            json!({"username": "amal", "password": "wrong"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = extract_json(response.into_body()).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_me_reports_anonymous_without_session() {
    let t = setup().await;

    let response = t.app.oneshot(get("/api/auth/me")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["anonymous"], true);
}

#[tokio::test]
async fn test_me_returns_user_with_session() {
    let t = setup().await;
    let (_, cookie) = login_as(&t.db, "amal", "editor").await;

    let response = t.app.oneshot(get_auth("/api/auth/me", &cookie)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["anonymous"], false);
    assert_eq!(body["user"]["username"], "amal");
    assert_eq!(body["user"]["role"], "editor");
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let t = setup().await;
    let (_, cookie) = login_as(&t.db, "amal", "author").await;

    let response = t
        .app
        .clone()
        .oneshot(send_json("POST", "/api/auth/logout", Some(&cookie), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("Should clear session cookie")
        .to_str()
        .unwrap();
    assert!(set_cookie.contains("Max-Age=0"));

    // The session no longer works
    let response = t
        .app
        .oneshot(send_json(
            "POST",
            "/api/articles",
            Some(&cookie),
            json!({"title": "x", "category_id": "y"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_password_reset_flow() {
    let t = setup().await;
    insert_user(&t.db, "amal", "author").await;

    // Request a reset token by email
    let response = t
        .app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/auth/request-reset",
            None,
            json!({"email": "amal@nashir.example"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    let token = body["reset_token"].as_str().expect("Should issue token").to_string();

    // Consume it
    let response = t
        .app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/auth/reset-password",
            None,
            json!({"token": token, "password": "new password 1", "confirm": "new password 1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Old password no longer works, new one does
    let response = t
        .app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/auth/login",
            None,
            json!({"username": "amal", "password": "correct horse"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = t
        .app
        .oneshot(send_json(
            "POST",
            "/api/auth/login",
            None,
            json!({"username": "amal", "password": "new password 1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_password_reset_does_not_leak_accounts() {
    let t = setup().await;

    let response = t
        .app
        .oneshot(send_json(
            "POST",
            "/api/auth/request-reset",
            None,
            json!({"email": "nobody@nashir.example"}),
        ))
        .await
        .unwrap();
    // Same response shape for unknown accounts
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert!(body["reset_token"].is_null());
}

#[tokio::test]
async fn test_password_reset_rejects_mismatched_confirm() {
    let t = setup().await;
    insert_user(&t.db, "amal", "author").await;

    let response = t
        .app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/auth/request-reset",
            None,
            json!({"email": "amal@nashir.example"}),
        ))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    let token = body["reset_token"].as_str().unwrap().to_string();

    let response = t
        .app
        .oneshot(send_json(
            "POST",
            "/api/auth/reset-password",
            None,
            json!({"token": token, "password": "new password 1", "confirm": "different"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========================================
// Session Middleware and Roles
// ========================================

#[tokio::test]
async fn test_protected_route_requires_session() {
    let t = setup().await;

    let response = t
        .app
        .oneshot(send_json(
            "POST",
            "/api/articles",
            None,
            json!({"title": "x", "category_id": "y"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_reader_cannot_create_articles() {
    let t = setup().await;
    let (_, cookie) = login_as(&t.db, "reader1", "reader").await;
    let economy = category_guid(&t.db, "economy").await;

    let response = t
        .app
        .oneshot(send_json(
            "POST",
            "/api/articles",
            Some(&cookie),
            json!({"title": "Oil prices", "category_id": economy}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ========================================
// Article Creation and Editing
// ========================================

#[tokio::test]
async fn test_create_article_generates_arabic_slug() {
    let t = setup().await;
    let (author, cookie) = login_as(&t.db, "amal", "author").await;
    let economy = category_guid(&t.db, "economy").await;

    let body = create_draft(&t.app, &cookie, "ارتفاع أسعار النفط", &economy).await;
    assert_eq!(body["slug"], "ارتفاع-أسعار-النفط");
    assert_eq!(body["status"], "draft");
    assert_eq!(body["language"], "ar");
    assert_eq!(body["kind"], "news");
    assert_eq!(body["author_id"], author);
    assert!(body["published_at"].is_null());
}

#[tokio::test]
async fn test_create_article_slug_collision_gets_suffix() {
    let t = setup().await;
    let (_, cookie) = login_as(&t.db, "amal", "author").await;
    let economy = category_guid(&t.db, "economy").await;

    let first = create_draft(&t.app, &cookie, "Market Report", &economy).await;
    let second = create_draft(&t.app, &cookie, "Market Report", &economy).await;

    assert_eq!(first["slug"], "market-report");
    assert_eq!(second["slug"], "market-report-2");
}

#[tokio::test]
async fn test_create_article_rejects_unknown_category() {
    let t = setup().await;
    let (_, cookie) = login_as(&t.db, "amal", "author").await;

    let response = t
        .app
        .oneshot(send_json(
            "POST",
            "/api/articles",
            Some(&cookie),
            json!({"title": "Oil prices", "category_id": "no-such-category"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_article_rejects_too_many_tags() {
    let t = setup().await;
    let (_, cookie) = login_as(&t.db, "amal", "author").await;
    let economy = category_guid(&t.db, "economy").await;

    let tags: Vec<String> = (0..11).map(|i| format!("tag{}", i)).collect();
    let response = t
        .app
        .oneshot(send_json(
            "POST",
            "/api/articles",
            Some(&cookie),
            json!({"title": "Oil prices", "category_id": economy, "tags": tags}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_duplicate_tags_collapse() {
    let t = setup().await;
    let (_, cookie) = login_as(&t.db, "amal", "author").await;
    let economy = category_guid(&t.db, "economy").await;

    let response = t
        .app
        .oneshot(send_json(
            "POST",
            "/api/articles",
            Some(&cookie),
            json!({
                "title": "Oil prices",
                "category_id": economy,
                "tags": ["Energy", "energy", "oil"],
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    let tags = body["tags"].as_array().unwrap();
    assert_eq!(tags.len(), 2);
    assert_eq!(tags[0], "Energy");
    assert_eq!(tags[1], "oil");
}

#[tokio::test]
async fn test_owner_can_edit_draft() {
    let t = setup().await;
    let (_, cookie) = login_as(&t.db, "amal", "author").await;
    let economy = category_guid(&t.db, "economy").await;

    let draft = create_draft(&t.app, &cookie, "Market Report", &economy).await;
    let uri = format!("/api/articles/{}", draft["guid"].as_str().unwrap());

    let response = t
        .app
        .oneshot(send_json(
            "PUT",
            &uri,
            Some(&cookie),
            json!({"title": "Market Report, Revised", "summary": "better summary"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["title"], "Market Report, Revised");
    assert_eq!(body["summary"], "better summary");
    // The slug is stable across edits
    assert_eq!(body["slug"], "market-report");
}

#[tokio::test]
async fn test_other_author_cannot_edit_draft() {
    let t = setup().await;
    let (_, owner_cookie) = login_as(&t.db, "amal", "author").await;
    let (_, other_cookie) = login_as(&t.db, "badr", "author").await;
    let economy = category_guid(&t.db, "economy").await;

    let draft = create_draft(&t.app, &owner_cookie, "Market Report", &economy).await;
    let uri = format!("/api/articles/{}", draft["guid"].as_str().unwrap());

    let response = t
        .app
        .clone()
        .oneshot(send_json("PUT", &uri, Some(&other_cookie), json!({"title": "Hijacked"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // An editor may edit anyone's draft
    let (_, editor_cookie) = login_as(&t.db, "editor1", "editor").await;
    let response = t
        .app
        .oneshot(send_json("PUT", &uri, Some(&editor_cookie), json!({"title": "Desk edit"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_published_article_cannot_be_edited() {
    let t = setup().await;
    let (_, cookie) = login_as(&t.db, "editor1", "editor").await;
    let economy = category_guid(&t.db, "economy").await;

    let draft = create_draft(&t.app, &cookie, "Market Report", &economy).await;
    let guid = draft["guid"].as_str().unwrap().to_string();
    publish(&t.app, &cookie, &guid).await;

    let response = t
        .app
        .oneshot(send_json(
            "PUT",
            &format!("/api/articles/{}", guid),
            Some(&cookie),
            json!({"title": "Too late"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

// ========================================
// Publish Lifecycle
// ========================================

#[tokio::test]
async fn test_publish_sets_status_and_timestamp() {
    let t = setup().await;
    let (_, cookie) = login_as(&t.db, "editor1", "editor").await;
    let economy = category_guid(&t.db, "economy").await;

    let draft = create_draft(&t.app, &cookie, "Market Report", &economy).await;
    let guid = draft["guid"].as_str().unwrap().to_string();

    let published = publish(&t.app, &cookie, &guid).await;
    assert_eq!(published["status"], "published");
    assert!(published["published_at"].is_string());
}

#[tokio::test]
async fn test_publish_twice_conflicts() {
    let t = setup().await;
    let (_, cookie) = login_as(&t.db, "editor1", "editor").await;
    let economy = category_guid(&t.db, "economy").await;

    let draft = create_draft(&t.app, &cookie, "Market Report", &economy).await;
    let guid = draft["guid"].as_str().unwrap().to_string();
    publish(&t.app, &cookie, &guid).await;

    let response = t
        .app
        .oneshot(send_json(
            "POST",
            &format!("/api/admin/articles/{}/publish", guid),
            Some(&cookie),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_author_cannot_publish() {
    let t = setup().await;
    let (_, author_cookie) = login_as(&t.db, "amal", "author").await;
    let economy = category_guid(&t.db, "economy").await;

    let draft = create_draft(&t.app, &author_cookie, "Market Report", &economy).await;
    let guid = draft["guid"].as_str().unwrap();

    let response = t
        .app
        .oneshot(send_json(
            "POST",
            &format!("/api/admin/articles/{}/publish", guid),
            Some(&author_cookie),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_archive_clears_featured_flag() {
    let t = setup().await;
    let (_, cookie) = login_as(&t.db, "editor1", "editor").await;
    let economy = category_guid(&t.db, "economy").await;

    let draft = create_draft(&t.app, &cookie, "Market Report", &economy).await;
    let guid = draft["guid"].as_str().unwrap().to_string();
    publish(&t.app, &cookie, &guid).await;

    let response = t
        .app
        .clone()
        .oneshot(send_json(
            "POST",
            &format!("/api/admin/articles/{}/feature", guid),
            Some(&cookie),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["featured"], true);

    let response = t
        .app
        .oneshot(send_json(
            "POST",
            &format!("/api/admin/articles/{}/archive", guid),
            Some(&cookie),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "archived");
    assert_eq!(body["featured"], false);
}

#[tokio::test]
async fn test_feature_requires_published() {
    let t = setup().await;
    let (_, cookie) = login_as(&t.db, "editor1", "editor").await;
    let economy = category_guid(&t.db, "economy").await;

    let draft = create_draft(&t.app, &cookie, "Market Report", &economy).await;
    let guid = draft["guid"].as_str().unwrap();

    let response = t
        .app
        .oneshot(send_json(
            "POST",
            &format!("/api/admin/articles/{}/feature", guid),
            Some(&cookie),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_delete_requires_archived_and_admin() {
    let t = setup().await;
    let (_, admin_cookie) = login_as(&t.db, "admin1", "admin").await;
    let (_, editor_cookie) = login_as(&t.db, "editor1", "editor").await;
    let economy = category_guid(&t.db, "economy").await;

    let draft = create_draft(&t.app, &admin_cookie, "Market Report", &economy).await;
    let guid = draft["guid"].as_str().unwrap().to_string();
    let uri = format!("/api/articles/{}", guid);

    // Draft cannot be deleted
    let response = t.app.clone().oneshot(delete_auth(&uri, &admin_cookie)).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    publish(&t.app, &admin_cookie, &guid).await;
    let response = t
        .app
        .clone()
        .oneshot(send_json(
            "POST",
            &format!("/api/admin/articles/{}/archive", guid),
            Some(&admin_cookie),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Editors cannot delete even archived articles
    let response = t.app.clone().oneshot(delete_auth(&uri, &editor_cookie)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = t.app.clone().oneshot(delete_auth(&uri, &admin_cookie)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "deleted");

    let response = t.app.oneshot(get_auth(&uri, &admin_cookie)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ========================================
// Article Detail Visibility
// ========================================

#[tokio::test]
async fn test_draft_detail_hidden_from_readers() {
    let t = setup().await;
    let (_, cookie) = login_as(&t.db, "editor1", "editor").await;
    let economy = category_guid(&t.db, "economy").await;

    let draft = create_draft(&t.app, &cookie, "Market Report", &economy).await;
    let guid = draft["guid"].as_str().unwrap().to_string();

    // Anonymous readers see a 404, not a 403
    let response = t
        .app
        .clone()
        .oneshot(get("/api/articles/market-report"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Staff can preview the draft
    let response = t
        .app
        .clone()
        .oneshot(get_auth("/api/articles/market-report", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // After publishing it is public
    publish(&t.app, &cookie, &guid).await;
    let response = t
        .app
        .oneshot(get("/api/articles/market-report"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["title"], "Market Report");
    assert!(body["body"].is_string());
}

// ========================================
// Reader Feeds
// ========================================

#[tokio::test]
async fn test_feed_lists_only_published() {
    let t = setup().await;
    let (_, cookie) = login_as(&t.db, "editor1", "editor").await;
    let economy = category_guid(&t.db, "economy").await;

    let a = create_draft(&t.app, &cookie, "Published Story", &economy).await;
    create_draft(&t.app, &cookie, "Still a Draft", &economy).await;
    publish(&t.app, &cookie, a["guid"].as_str().unwrap()).await;

    let response = t.app.oneshot(get("/api/feed")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["page"], 1);
    assert_eq!(body["articles"][0]["title"], "Published Story");
    // Cards never include the article body
    assert!(body["articles"][0].get("body").is_none());
}

#[tokio::test]
async fn test_feed_filters_by_category_and_search() {
    let t = setup().await;
    let (_, cookie) = login_as(&t.db, "editor1", "editor").await;
    let economy = category_guid(&t.db, "economy").await;
    let sports = category_guid(&t.db, "sports").await;

    let a = create_draft(&t.app, &cookie, "Oil Markets Today", &economy).await;
    let b = create_draft(&t.app, &cookie, "Cup Final Preview", &sports).await;
    publish(&t.app, &cookie, a["guid"].as_str().unwrap()).await;
    publish(&t.app, &cookie, b["guid"].as_str().unwrap()).await;

    let response = t
        .app
        .clone()
        .oneshot(get("/api/articles?category=economy"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["articles"][0]["title"], "Oil Markets Today");

    let response = t.app.clone().oneshot(get("/api/articles?q=cup")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["articles"][0]["title"], "Cup Final Preview");

    let response = t
        .app
        .oneshot(get("/api/articles?category=economy&q=cup"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_arabic_search_is_percent_decoded() {
    let t = setup().await;
    let (_, cookie) = login_as(&t.db, "editor1", "editor").await;
    let economy = category_guid(&t.db, "economy").await;

    let a = create_draft(&t.app, &cookie, "أسعار النفط ترتفع", &economy).await;
    publish(&t.app, &cookie, a["guid"].as_str().unwrap()).await;

    // "النفط" percent-encoded
    let response = t
        .app
        .oneshot(get("/api/articles?q=%D8%A7%D9%84%D9%86%D9%81%D8%B7"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total"], 1);
}

#[tokio::test]
async fn test_featured_strip() {
    let t = setup().await;
    let (_, cookie) = login_as(&t.db, "editor1", "editor").await;
    let economy = category_guid(&t.db, "economy").await;

    let a = create_draft(&t.app, &cookie, "Front Page Story", &economy).await;
    let b = create_draft(&t.app, &cookie, "Ordinary Story", &economy).await;
    let a_guid = a["guid"].as_str().unwrap().to_string();
    publish(&t.app, &cookie, &a_guid).await;
    publish(&t.app, &cookie, b["guid"].as_str().unwrap()).await;

    let response = t
        .app
        .clone()
        .oneshot(send_json(
            "POST",
            &format!("/api/admin/articles/{}/feature", a_guid),
            Some(&cookie),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = t.app.oneshot(get("/api/feed/featured")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    let articles = body["articles"].as_array().unwrap();
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0]["title"], "Front Page Story");
}

#[tokio::test]
async fn test_category_feed_unknown_slug_is_404() {
    let t = setup().await;

    let response = t
        .app
        .oneshot(get("/api/categories/no-such-section/articles"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_latest_digest() {
    let t = setup().await;
    let (_, cookie) = login_as(&t.db, "editor1", "editor").await;
    let economy = category_guid(&t.db, "economy").await;

    // No digest published yet
    let response = t.app.clone().oneshot(get("/api/digest/latest")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = t
        .app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/articles",
            Some(&cookie),
            json!({
                "title": "Morning Digest",
                "kind": "digest",
                "category_id": economy,
            }),
        ))
        .await
        .unwrap();
    let digest = extract_json(response.into_body()).await;
    publish(&t.app, &cookie, digest["guid"].as_str().unwrap()).await;

    let response = t.app.oneshot(get("/api/digest/latest")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["title"], "Morning Digest");
}

// ========================================
// Lite Feed
// ========================================

#[tokio::test]
async fn test_lite_feed_cursor_pagination() {
    let t = setup().await;
    let (_, cookie) = login_as(&t.db, "editor1", "editor").await;
    let economy = category_guid(&t.db, "economy").await;

    for i in 0..10 {
        let draft = create_draft(&t.app, &cookie, &format!("Story Number {}", i), &economy).await;
        publish(&t.app, &cookie, draft["guid"].as_str().unwrap()).await;
    }

    // First page: 8 cards, newest first, with a cursor
    let response = t.app.clone().oneshot(get("/api/lite/feed")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    let cards = body["cards"].as_array().unwrap();
    assert_eq!(cards.len(), 8);
    assert_eq!(cards[0]["title"], "Story Number 9");
    assert_eq!(cards[7]["title"], "Story Number 2");
    assert_eq!(cards[0]["category_name"], "اقتصاد");
    let cursor = body["next_cursor"].as_str().expect("Should have cursor").to_string();

    // Second page: the remaining 2, no further cursor
    let uri = format!("/api/lite/feed?cursor={}", encode_cursor(&cursor));
    let response = t.app.clone().oneshot(get(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    let cards = body["cards"].as_array().unwrap();
    assert_eq!(cards.len(), 2);
    assert_eq!(cards[0]["title"], "Story Number 1");
    assert_eq!(cards[1]["title"], "Story Number 0");
    assert!(body["next_cursor"].is_null());
}

#[tokio::test]
async fn test_lite_feed_rejects_garbage_cursor() {
    let t = setup().await;

    let response = t
        .app
        .oneshot(get("/api/lite/feed?cursor=not-a-cursor"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========================================
// View Counting
// ========================================

#[tokio::test]
async fn test_view_dedup_window() {
    let t = setup().await;
    let (_, cookie) = login_as(&t.db, "editor1", "editor").await;
    let economy = category_guid(&t.db, "economy").await;

    let draft = create_draft(&t.app, &cookie, "Market Report", &economy).await;
    publish(&t.app, &cookie, draft["guid"].as_str().unwrap()).await;

    let view = |key: &str| {
        send_json(
            "POST",
            "/api/articles/market-report/view",
            None,
            json!({"session_key": key}),
        )
    };

    let response = t.app.clone().oneshot(view("device-a")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["counted"], true);

    // Same session inside the window does not count again
    let response = t.app.clone().oneshot(view("device-a")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["counted"], false);

    // A different session counts
    let response = t.app.oneshot(view("device-b")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["counted"], true);

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM article_views")
        .fetch_one(&t.db)
        .await
        .unwrap();
    assert_eq!(total, 2);
}

#[tokio::test]
async fn test_view_requires_published_article() {
    let t = setup().await;
    let (_, cookie) = login_as(&t.db, "editor1", "editor").await;
    let economy = category_guid(&t.db, "economy").await;

    create_draft(&t.app, &cookie, "Market Report", &economy).await;

    let response = t
        .app
        .oneshot(send_json(
            "POST",
            "/api/articles/market-report/view",
            None,
            json!({"session_key": "device-a"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ========================================
// Categories
// ========================================

#[tokio::test]
async fn test_list_categories_public() {
    let t = setup().await;

    let response = t.app.oneshot(get("/api/categories")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    let categories = body.as_array().unwrap();
    assert_eq!(categories.len(), 6);
    // Ordered by position
    assert_eq!(categories[0]["slug"], "local");
    assert_eq!(categories[0]["name_ar"], "محليات");
    assert_eq!(categories[0]["name_en"], "Local");
}

#[tokio::test]
async fn test_category_crud_is_admin_only() {
    let t = setup().await;
    let (_, editor_cookie) = login_as(&t.db, "editor1", "editor").await;
    let (_, admin_cookie) = login_as(&t.db, "admin1", "admin").await;

    let request_body = json!({"name_ar": "صحة", "name_en": "Health"});

    let response = t
        .app
        .clone()
        .oneshot(send_json("POST", "/api/categories", Some(&editor_cookie), request_body.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = t
        .app
        .clone()
        .oneshot(send_json("POST", "/api/categories", Some(&admin_cookie), request_body.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["slug"], "health");

    // Duplicate slug is a conflict
    let response = t
        .app
        .oneshot(send_json("POST", "/api/categories", Some(&admin_cookie), request_body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_category_with_articles_cannot_be_deleted() {
    let t = setup().await;
    let (_, admin_cookie) = login_as(&t.db, "admin1", "admin").await;
    let economy = category_guid(&t.db, "economy").await;

    create_draft(&t.app, &admin_cookie, "Market Report", &economy).await;

    let response = t
        .app
        .oneshot(delete_auth(&format!("/api/categories/{}", economy), &admin_cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

// ========================================
// Angles
// ========================================

#[tokio::test]
async fn test_angle_attach_and_public_detail() {
    let t = setup().await;
    let (_, admin_cookie) = login_as(&t.db, "admin1", "admin").await;
    let economy = category_guid(&t.db, "economy").await;

    let response = t
        .app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/angles",
            Some(&admin_cookie),
            json!({"title": "Energy Transition", "description": "Long-form follow-up"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let angle = extract_json(response.into_body()).await;
    assert_eq!(angle["slug"], "energy-transition");
    let angle_guid = angle["guid"].as_str().unwrap().to_string();

    let draft = create_draft(&t.app, &admin_cookie, "Solar Expansion", &economy).await;
    let article_guid = draft["guid"].as_str().unwrap().to_string();
    publish(&t.app, &admin_cookie, &article_guid).await;

    let response = t
        .app
        .clone()
        .oneshot(send_json(
            "POST",
            &format!("/api/angles/{}/articles", angle_guid),
            Some(&admin_cookie),
            json!({"article_id": article_guid, "position": 1}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = t
        .app
        .oneshot(get("/api/angles/energy-transition"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["angle"]["title"], "Energy Transition");
    let articles = body["articles"].as_array().unwrap();
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0]["title"], "Solar Expansion");
}

// ========================================
// Smart Blocks
// ========================================

#[tokio::test]
async fn test_smart_block_hydration() {
    let t = setup().await;
    let (_, admin_cookie) = login_as(&t.db, "admin1", "admin").await;
    let economy = category_guid(&t.db, "economy").await;

    let response = t
        .app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/smart-blocks",
            Some(&admin_cookie),
            json!({"title": "Oil Watch", "keyword": "oil", "max_items": 5}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let matching = create_draft(&t.app, &admin_cookie, "Oil prices climb again", &economy).await;
    let other = create_draft(&t.app, &admin_cookie, "Banking results", &economy).await;
    publish(&t.app, &admin_cookie, matching["guid"].as_str().unwrap()).await;
    publish(&t.app, &admin_cookie, other["guid"].as_str().unwrap()).await;

    let response = t.app.oneshot(get("/api/smart-blocks")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    let blocks = body.as_array().unwrap();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0]["block"]["title"], "Oil Watch");
    let articles = blocks[0]["articles"].as_array().unwrap();
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0]["title"], "Oil prices climb again");
}

#[tokio::test]
async fn test_smart_block_rejects_bad_layout() {
    let t = setup().await;
    let (_, admin_cookie) = login_as(&t.db, "admin1", "admin").await;

    let response = t
        .app
        .oneshot(send_json(
            "POST",
            "/api/smart-blocks",
            Some(&admin_cookie),
            json!({"title": "Oil Watch", "keyword": "oil", "layout": "carousel"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========================================
// Themes
// ========================================

#[tokio::test]
async fn test_theme_activation_is_exclusive() {
    let t = setup().await;
    let (_, admin_cookie) = login_as(&t.db, "admin1", "admin").await;

    let response = t
        .app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/themes",
            Some(&admin_cookie),
            json!({"name": "Night", "tokens": {"palette": {"background": "#000000"}}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let theme = extract_json(response.into_body()).await;
    assert_eq!(theme["active"], false);
    let theme_guid = theme["guid"].as_str().unwrap().to_string();

    let response = t
        .app
        .clone()
        .oneshot(send_json(
            "POST",
            &format!("/api/themes/{}/activate", theme_guid),
            Some(&admin_cookie),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = t.app.oneshot(get("/api/themes")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    let themes = body.as_array().unwrap();
    assert_eq!(themes.len(), 2);
    let active: Vec<&Value> = themes.iter().filter(|v| v["active"] == true).collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0]["name"], "Night");
    assert!(active[0]["tokens"]["palette"]["background"].is_string());
}

#[tokio::test]
async fn test_theme_tokens_must_be_object() {
    let t = setup().await;
    let (_, admin_cookie) = login_as(&t.db, "admin1", "admin").await;

    let response = t
        .app
        .oneshot(send_json(
            "POST",
            "/api/themes",
            Some(&admin_cookie),
            json!({"name": "Broken", "tokens": "not an object"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========================================
// Announcements
// ========================================

#[tokio::test]
async fn test_active_announcements_respect_window() {
    let t = setup().await;
    let (_, admin_cookie) = login_as(&t.db, "admin1", "admin").await;

    let response = t
        .app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/announcements",
            Some(&admin_cookie),
            json!({"title": "Maintenance tonight", "body": "Short outage", "level": "warning"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // A window that already closed
    let response = t
        .app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/announcements",
            Some(&admin_cookie),
            json!({
                "title": "Old notice",
                "body": "Expired",
                "level": "info",
                "ends_at": "2020-01-01T00:00:00Z",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = t.app.oneshot(get("/api/announcements/active")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["title"], "Maintenance tonight");
}

#[tokio::test]
async fn test_critical_announcements_sort_first() {
    let t = setup().await;
    let (_, admin_cookie) = login_as(&t.db, "admin1", "admin").await;

    for (title, level) in [("Heads up", "info"), ("Site down soon", "critical")] {
        let response = t
            .app
            .clone()
            .oneshot(send_json(
                "POST",
                "/api/announcements",
                Some(&admin_cookie),
                json!({"title": title, "body": "x", "level": level}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = t.app.oneshot(get("/api/announcements/active")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body[0]["title"], "Site down soon");
}

// ========================================
// Tasks
// ========================================

#[tokio::test]
async fn test_task_status_transitions() {
    let t = setup().await;
    let (_, cookie) = login_as(&t.db, "editor1", "editor").await;

    let response = t
        .app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/tasks",
            Some(&cookie),
            json!({"title": "Fact-check the oil story", "priority": "high"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let task = extract_json(response.into_body()).await;
    assert_eq!(task["status"], "open");
    let guid = task["guid"].as_str().unwrap().to_string();
    let status_uri = format!("/api/tasks/{}/status", guid);

    // open -> done is not allowed
    let response = t
        .app
        .clone()
        .oneshot(send_json("POST", &status_uri, Some(&cookie), json!({"status": "done"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // open -> in_progress -> done
    let response = t
        .app
        .clone()
        .oneshot(send_json("POST", &status_uri, Some(&cookie), json!({"status": "in_progress"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = t
        .app
        .oneshot(send_json("POST", &status_uri, Some(&cookie), json!({"status": "done"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "done");
}

#[tokio::test]
async fn test_task_assignee_must_be_staff() {
    let t = setup().await;
    let (_, cookie) = login_as(&t.db, "editor1", "editor").await;
    let (reader, _) = login_as(&t.db, "reader1", "reader").await;

    let response = t
        .app
        .oneshot(send_json(
            "POST",
            "/api/tasks",
            Some(&cookie),
            json!({"title": "Review photos", "assignee_id": reader}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========================================
// Chat
// ========================================

#[tokio::test]
async fn test_chat_post_and_list() {
    let t = setup().await;
    let (_, cookie) = login_as(&t.db, "amal", "author").await;

    let response = t.app.clone().oneshot(get_auth("/api/chat/channels", &cookie)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let channels = extract_json(response.into_body()).await;
    let general = channels
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["name"] == "general")
        .expect("Should have seeded general channel")["guid"]
        .as_str()
        .unwrap()
        .to_string();

    let messages_uri = format!("/api/chat/channels/{}/messages", general);
    for text in ["Morning all", "Front page is set"] {
        let response = t
            .app
            .clone()
            .oneshot(send_json("POST", &messages_uri, Some(&cookie), json!({"body": text})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = extract_json(response.into_body()).await;
        assert_eq!(body["sender_name"], "amal");
    }

    let response = t.app.clone().oneshot(get_auth(&messages_uri, &cookie)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total"], 2);
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);

    // Empty messages are rejected
    let response = t
        .app
        .oneshot(send_json("POST", &messages_uri, Some(&cookie), json!({"body": "   "})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_chat_message_length_limit() {
    let t = setup().await;
    let (_, cookie) = login_as(&t.db, "amal", "author").await;

    let general: String = sqlx::query_scalar("SELECT guid FROM chat_channels WHERE name = 'general'")
        .fetch_one(&t.db)
        .await
        .unwrap();

    let long_body = "م".repeat(2001);
    let response = t
        .app
        .oneshot(send_json(
            "POST",
            &format!("/api/chat/channels/{}/messages", general),
            Some(&cookie),
            json!({"body": long_body}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_chat_channel_creation_is_admin_only() {
    let t = setup().await;
    let (_, author_cookie) = login_as(&t.db, "amal", "author").await;
    let (_, admin_cookie) = login_as(&t.db, "admin1", "admin").await;

    let response = t
        .app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/chat/channels",
            Some(&author_cookie),
            json!({"name": "sports-desk"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = t
        .app
        .oneshot(send_json(
            "POST",
            "/api/chat/channels",
            Some(&admin_cookie),
            json!({"name": "sports-desk", "topic": "All things sports"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// ========================================
// Preferences
// ========================================

#[tokio::test]
async fn test_prefs_round_trip_and_whitelist() {
    let t = setup().await;
    let (_, cookie) = login_as(&t.db, "reader1", "reader").await;

    let response = t
        .app
        .clone()
        .oneshot(send_json(
            "PUT",
            "/api/prefs",
            Some(&cookie),
            json!({"key": "font_scale", "value": "1.25"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = t.app.clone().oneshot(get_auth("/api/prefs", &cookie)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["font_scale"], "1.25");

    let response = t
        .app
        .oneshot(send_json(
            "PUT",
            "/api/prefs",
            Some(&cookie),
            json!({"key": "favorite_color", "value": "green"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========================================
// Editorial Dictionary
// ========================================

#[tokio::test]
async fn test_entity_crud() {
    let t = setup().await;
    let (_, cookie) = login_as(&t.db, "editor1", "editor").await;

    let response = t
        .app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/smart/entities",
            Some(&cookie),
            json!({
                "name": "منظمة أوبك",
                "entity_type": "organization",
                "aliases": ["أوبك", "OPEC", " OPEC "],
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let entity = extract_json(response.into_body()).await;
    let aliases = entity["aliases"].as_array().unwrap();
    // Aliases are trimmed and deduplicated
    assert_eq!(aliases.len(), 2);

    // Duplicate names conflict
    let response = t
        .app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/smart/entities",
            Some(&cookie),
            json!({"name": "منظمة أوبك", "entity_type": "organization"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let guid = entity["guid"].as_str().unwrap();
    let response = t
        .app
        .oneshot(delete_auth(&format!("/api/smart/entities/{}", guid), &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_entity_rejects_unknown_type() {
    let t = setup().await;
    let (_, cookie) = login_as(&t.db, "editor1", "editor").await;

    let response = t
        .app
        .oneshot(send_json(
            "POST",
            "/api/smart/entities",
            Some(&cookie),
            json!({"name": "OPEC", "entity_type": "cartel"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========================================
// Analytics
// ========================================

#[tokio::test]
async fn test_stats_overview() {
    let t = setup().await;
    let (_, author_cookie) = login_as(&t.db, "amal", "author").await;
    let (_, editor_cookie) = login_as(&t.db, "editor1", "editor").await;
    let economy = category_guid(&t.db, "economy").await;

    let draft = create_draft(&t.app, &author_cookie, "Market Report", &economy).await;
    publish(&t.app, &editor_cookie, draft["guid"].as_str().unwrap()).await;
    create_draft(&t.app, &author_cookie, "Unfinished", &economy).await;

    let response = t
        .app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/articles/market-report/view",
            None,
            json!({"session_key": "device-a"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Authors do not see newsroom-wide analytics
    let response = t
        .app
        .clone()
        .oneshot(get_auth("/api/admin/stats/overview", &author_cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = t
        .app
        .oneshot(get_auth("/api/admin/stats/overview", &editor_cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["articles_by_status"]["published"], 1);
    assert_eq!(body["articles_by_status"]["draft"], 1);
    assert_eq!(body["views_last_7_days"], 1);
    // The seeded Anonymous account is not a real user
    assert_eq!(body["total_users"], 2);
    let top = body["top_articles"].as_array().unwrap();
    assert_eq!(top[0]["title"], "Market Report");
    assert_eq!(top[0]["views"], 1);
}

#[tokio::test]
async fn test_per_article_stats() {
    let t = setup().await;
    let (_, cookie) = login_as(&t.db, "editor1", "editor").await;
    let economy = category_guid(&t.db, "economy").await;

    let draft = create_draft(&t.app, &cookie, "Market Report", &economy).await;
    let guid = draft["guid"].as_str().unwrap().to_string();
    publish(&t.app, &cookie, &guid).await;

    for key in ["a", "b", "c"] {
        let response = t
            .app
            .clone()
            .oneshot(send_json(
                "POST",
                "/api/articles/market-report/view",
                None,
                json!({"session_key": key}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = t
        .app
        .oneshot(get_auth(&format!("/api/admin/stats/articles/{}", guid), &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total_views"], 3);
    assert_eq!(body["views_last_30_days"], 3);
}
