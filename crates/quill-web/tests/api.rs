//! End-to-end tests driving the router with `oneshot`.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use quill_core::MemoryStore;
use quill_web::{router, AppState, ServerConfig};
use serde_json::{json, Value};
use tower::ServiceExt;

const SECRET: &str = "test-secret-0123456789abcdef0123456789";

struct TestApp {
    state: AppState,
    store: Arc<MemoryStore>,
}

fn test_app() -> TestApp {
    let mut config = ServerConfig::default();
    config.auth.jwt_secret = SECRET.to_string();
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(config, store.clone());
    TestApp { state, store }
}

fn request(method: &str, uri: &str, body: Option<Value>, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &TestApp, req: Request<Body>) -> (StatusCode, Value) {
    let response = router(app.state.clone()).oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn register(app: &TestApp, email: &str, password: &str) -> StatusCode {
    let req = request(
        "POST",
        "/api/users/register",
        Some(json!({ "email": email, "password": password })),
        None,
    );
    send(app, req).await.0
}

async fn login(app: &TestApp, email: &str, password: &str) -> (StatusCode, Value) {
    let req = request(
        "POST",
        "/api/auth/login",
        Some(json!({ "email": email, "password": password })),
        None,
    );
    send(app, req).await
}

async fn signed_in(app: &TestApp, email: &str) -> String {
    assert_eq!(register(app, email, "password123").await, StatusCode::OK);
    let (status, body) = login(app, email, "password123").await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

async fn create_post(app: &TestApp, token: &str, body: Value) -> Value {
    let (status, post) = send(app, request("POST", "/api/posts", Some(body), Some(token))).await;
    assert_eq!(status, StatusCode::CREATED);
    post
}

// --- Rate limiting ---

#[tokio::test]
async fn sixth_registration_from_same_ip_is_rate_limited() {
    let app = test_app();

    for i in 0..5 {
        let req = Request::builder()
            .method("POST")
            .uri("/api/users/register")
            .header("content-type", "application/json")
            .header("x-forwarded-for", "203.0.113.7")
            .body(Body::from(
                json!({ "email": format!("user{i}@example.com"), "password": "secret1" }).to_string(),
            ))
            .unwrap();
        assert_eq!(send(&app, req).await.0, StatusCode::OK, "attempt {i}");
    }

    let req = Request::builder()
        .method("POST")
        .uri("/api/users/register")
        .header("content-type", "application/json")
        .header("x-forwarded-for", "203.0.113.7")
        .body(Body::from(
            json!({ "email": "user5@example.com", "password": "secret1" }).to_string(),
        ))
        .unwrap();
    let (status, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(body["error"].as_str().unwrap().contains("wait"));
}

#[tokio::test]
async fn registration_limit_is_per_ip() {
    let app = test_app();
    let attempt = |ip: &'static str, email: String| {
        Request::builder()
            .method("POST")
            .uri("/api/users/register")
            .header("content-type", "application/json")
            .header("x-forwarded-for", ip)
            .body(Body::from(json!({ "email": email, "password": "secret1" }).to_string()))
            .unwrap()
    };

    for i in 0..6 {
        send(&app, attempt("198.51.100.1", format!("a{i}@example.com"))).await;
    }
    let (status, _) = send(&app, attempt("198.51.100.2", "b@example.com".into())).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn login_is_rate_limited_per_email() {
    let app = test_app();
    register(&app, "alice@example.com", "password123").await;

    for _ in 0..5 {
        let (status, _) = login(&app, "alice@example.com", "wrong-password").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
    let (status, body) = login(&app, "alice@example.com", "password123").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(body["error"].as_str().unwrap().contains("wait"));

    let (status, _) = login(&app, "bob@example.com", "whatever1").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// --- Registration and login ---

#[tokio::test]
async fn registration_validates_input() {
    let app = test_app();
    assert_eq!(register(&app, "", "password123").await, StatusCode::BAD_REQUEST);
    assert_eq!(register(&app, "no-at-sign", "password123").await, StatusCode::BAD_REQUEST);
    assert_eq!(register(&app, "a@example.com", "short").await, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = test_app();
    assert_eq!(register(&app, "a@example.com", "password123").await, StatusCode::OK);
    assert_eq!(register(&app, "a@example.com", "password123").await, StatusCode::CONFLICT);
}

#[tokio::test]
async fn login_returns_token_usable_for_profile() {
    let app = test_app();
    let token = signed_in(&app, "alice@example.com").await;

    let (status, body) = send(&app, request("GET", "/api/users/me", None, Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "alice@example.com");
    assert_eq!(body["name"], "alice");
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn logout_revokes_token() {
    let app = test_app();
    let token = signed_in(&app, "alice@example.com").await;

    let (status, _) = send(&app, request("POST", "/api/auth/logout", None, Some(&token))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, request("GET", "/api/users/me", None, Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn tampered_token_is_unauthorized() {
    let app = test_app();
    let token = signed_in(&app, "alice@example.com").await;
    let tampered = format!("{token}x");

    let (status, _) = send(&app, request("GET", "/api/users/me", None, Some(&tampered))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_update_changes_fields() {
    let app = test_app();
    let token = signed_in(&app, "alice@example.com").await;

    let (status, body) = send(
        &app,
        request("PUT", "/api/users/me", Some(json!({ "bio": "I write" })), Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bio"], "I write");
    assert_eq!(body["name"], "alice");
}

// --- Password reset ---

#[tokio::test]
async fn password_reset_flow() {
    let app = test_app();
    register(&app, "alice@example.com", "password123").await;

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/auth/reset/request",
            Some(json!({ "email": "alice@example.com" })),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let confirm = || {
        request(
            "POST",
            "/api/auth/reset/confirm",
            Some(json!({ "token": token, "password": "new-password" })),
            None,
        )
    };
    assert_eq!(send(&app, confirm()).await.0, StatusCode::OK);

    let (status, _) = login(&app, "alice@example.com", "new-password").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, confirm()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid or expired token");
}

#[tokio::test]
async fn reset_request_does_not_leak_existence() {
    let app = test_app();
    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/auth/reset/request",
            Some(json!({ "email": "nobody@example.com" })),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));
}

#[tokio::test]
async fn reset_request_is_rate_limited() {
    let app = test_app();
    let attempt = || {
        Request::builder()
            .method("POST")
            .uri("/api/auth/reset/request")
            .header("content-type", "application/json")
            .header("x-real-ip", "192.0.2.9")
            .body(Body::from(json!({ "email": "x@example.com" }).to_string()))
            .unwrap()
    };
    for _ in 0..3 {
        assert_eq!(send(&app, attempt()).await.0, StatusCode::OK);
    }
    let (status, body) = send(&app, attempt()).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(body["error"].as_str().unwrap().contains("wait"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reset_confirms_use_token_once() {
    let app = test_app();
    register(&app, "alice@example.com", "password123").await;
    let (_, body) = send(
        &app,
        request(
            "POST",
            "/api/auth/reset/request",
            Some(json!({ "email": "alice@example.com" })),
            None,
        ),
    )
    .await;
    let token = body["token"].as_str().unwrap().to_string();

    let confirm = |password: &str| {
        request(
            "POST",
            "/api/auth/reset/confirm",
            Some(json!({ "token": token, "password": password })),
            None,
        )
    };
    let ((first, _), (second, _)) = tokio::join!(
        send(&app, confirm("first-password")),
        send(&app, confirm("second-password")),
    );

    let mut statuses = [first, second];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::BAD_REQUEST]);

    let first_ok = login(&app, "alice@example.com", "first-password").await.0 == StatusCode::OK;
    let second_ok = login(&app, "alice@example.com", "second-password").await.0 == StatusCode::OK;
    assert!(first_ok ^ second_ok);
}

// --- Authorization guard ---

#[tokio::test]
async fn mutations_without_session_are_unauthorized_before_store_access() {
    let app = test_app();
    let cases = [
        request("POST", "/api/posts", Some(json!({ "title": "t" })), None),
        request("DELETE", "/api/posts/some-slug", None, None),
        request("PUT", "/api/posts/some-slug", Some(json!({ "title": "t" })), None),
        request("DELETE", "/api/comments/3f1c2d4e-0000-4000-8000-000000000000", None, None),
        request("POST", "/api/claps", Some(json!({ "postId": "x" })), None),
        request("POST", "/api/follow", Some(json!({ "target": "x@example.com" })), None),
    ];

    for req in cases {
        // A store call would fail with 500; the guard must answer first.
        app.store.fail_next();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Unauthorized");
    }
}

#[tokio::test]
async fn deleting_another_users_comment_is_forbidden() {
    let app = test_app();
    let alice = signed_in(&app, "user-a@example.com").await;
    let bob = signed_in(&app, "user-b@example.com").await;

    let post = create_post(&app, &alice, json!({ "title": "Hello", "published": true })).await;
    let (status, comment) = send(
        &app,
        request(
            "POST",
            "/api/comments",
            Some(json!({ "postId": post["id"], "body": "Nice post" })),
            Some(&bob),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let uri = format!("/api/comments/{}", comment["id"].as_str().unwrap());

    let (status, body) = send(&app, request("DELETE", &uri, None, Some(&alice))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Forbidden");

    let (status, _) = send(&app, request("DELETE", &uri, None, Some(&bob))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, request("DELETE", &uri, None, Some(&bob))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_resource_is_not_found_not_forbidden() {
    let app = test_app();
    let token = signed_in(&app, "user-a@example.com").await;

    let (status, _) = send(&app, request("DELETE", "/api/posts/no-such-post", None, Some(&token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        request("DELETE", "/api/comments/not-a-uuid", None, Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// --- Posts ---

#[tokio::test]
async fn post_lifecycle_respects_ownership() {
    let app = test_app();
    let alice = signed_in(&app, "user-a@example.com").await;
    let bob = signed_in(&app, "user-b@example.com").await;

    let post = create_post(
        &app,
        &alice,
        json!({ "title": "Rust Fixed Windows", "content": "# Heading", "published": true }),
    )
    .await;
    assert_eq!(post["slug"], "rust-fixed-windows");
    assert_eq!(post["authorEmail"], "user-a@example.com");

    let (status, fetched) = send(&app, request("GET", "/api/posts/rust-fixed-windows", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], post["id"]);

    let by_id = format!("/api/posts/{}", post["id"].as_str().unwrap());
    let (status, _) = send(&app, request("PUT", &by_id, Some(json!({ "title": "Hijacked" })), Some(&bob))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = send(&app, request("PUT", &by_id, Some(json!({ "title": "Renamed" })), Some(&alice))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Renamed");

    let (status, updated) = send(
        &app,
        request("PUT", "/api/posts", Some(json!({ "id": post["id"], "tags": ["rust"] })), Some(&alice)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["tags"], json!(["rust"]));

    let delete_uri = format!("/api/posts?id={}", post["id"].as_str().unwrap());
    let (status, _) = send(&app, request("DELETE", &delete_uri, None, Some(&bob))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, request("DELETE", &delete_uri, None, Some(&alice))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, request("GET", &by_id, None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn post_with_uuid_shaped_slug_is_reachable_by_slug() {
    let app = test_app();
    let alice = signed_in(&app, "alice@example.com").await;
    let slug = "3f2b8c1e-7d4a-4e9b-9c0f-5a6d7e8f9a0b";

    let post = create_post(&app, &alice, json!({ "slug": slug, "published": true })).await;
    assert_eq!(post["slug"], slug);

    let (status, fetched) = send(&app, request("GET", &format!("/api/posts/{slug}"), None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], post["id"]);
}

#[tokio::test]
async fn drafts_are_private_to_their_author() {
    let app = test_app();
    let alice = signed_in(&app, "user-a@example.com").await;
    let bob = signed_in(&app, "user-b@example.com").await;

    create_post(&app, &alice, json!({ "title": "Public", "published": true })).await;
    create_post(&app, &alice, json!({ "title": "Secret draft", "draft": true })).await;

    let (status, listing) = send(&app, request("GET", "/api/posts", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["pagination"]["total"], 1);
    assert_eq!(listing["posts"][0]["title"], "Public");

    let (status, _) = send(&app, request("GET", "/api/posts?published=false", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, mine) = send(&app, request("GET", "/api/posts?published=false", None, Some(&alice))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine["pagination"]["total"], 2);

    let (_, theirs) = send(&app, request("GET", "/api/posts?published=false", None, Some(&bob))).await;
    assert_eq!(theirs["pagination"]["total"], 0);

    let (status, _) = send(&app, request("GET", "/api/posts/secret-draft", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, request("GET", "/api/posts/secret-draft", None, Some(&bob))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, request("GET", "/api/posts/secret-draft", None, Some(&alice))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn listing_filters_and_paginates() {
    let app = test_app();
    let alice = signed_in(&app, "user-a@example.com").await;
    for i in 0..3 {
        create_post(
            &app,
            &alice,
            json!({ "title": format!("Rust {i}"), "tags": ["rust"], "published": true }),
        )
        .await;
    }
    create_post(&app, &alice, json!({ "title": "Go notes", "tags": ["go"], "published": true })).await;

    let (_, by_tag) = send(&app, request("GET", "/api/posts?tag=rust&limit=2", None, None)).await;
    assert_eq!(by_tag["pagination"]["total"], 3);
    assert_eq!(by_tag["pagination"]["totalPages"], 2);
    assert_eq!(by_tag["posts"].as_array().unwrap().len(), 2);

    let (_, search) = send(&app, request("GET", "/api/posts?q=GO", None, None)).await;
    assert_eq!(search["pagination"]["total"], 1);

    let (status, _) = send(&app, request("GET", "/api/posts?author=self", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// --- Claps, comments, follows ---

#[tokio::test]
async fn clapping_increments_count() {
    let app = test_app();
    let alice = signed_in(&app, "user-a@example.com").await;
    create_post(&app, &alice, json!({ "title": "Clap me", "published": true })).await;

    let clap = || request("POST", "/api/claps", Some(json!({ "postId": "clap-me" })), Some(&alice));
    assert_eq!(send(&app, clap()).await.1["claps"], 1);
    assert_eq!(send(&app, clap()).await.1["claps"], 2);

    let (status, _) = send(
        &app,
        request("POST", "/api/claps", Some(json!({ "postId": "missing" })), Some(&alice)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comments_list_in_order_for_a_post() {
    let app = test_app();
    let alice = signed_in(&app, "user-a@example.com").await;
    let post = create_post(&app, &alice, json!({ "title": "Thread", "published": true })).await;

    for body in ["first", "second"] {
        let (status, _) = send(
            &app,
            request("POST", "/api/comments", Some(json!({ "postId": "thread", "body": body })), Some(&alice)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let uri = format!("/api/comments?postId={}", post["id"].as_str().unwrap());
    let (status, comments) = send(&app, request("GET", &uri, None, None)).await;
    assert_eq!(status, StatusCode::OK);
    let comments = comments.as_array().unwrap();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0]["authorEmail"], "user-a@example.com");
    assert_eq!(comments[0]["postId"], post["id"]);

    let (status, _) = send(
        &app,
        request("POST", "/api/comments", Some(json!({ "postId": "missing", "body": "hi" })), Some(&alice)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn follow_toggles() {
    let app = test_app();
    let alice = signed_in(&app, "user-a@example.com").await;
    let follow = || {
        request(
            "POST",
            "/api/follow",
            Some(json!({ "target": "user-b@example.com" })),
            Some(&alice),
        )
    };

    let (status, body) = send(&app, follow()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "followed");
    assert_eq!(body["following"], json!(["user-b@example.com"]));

    let (_, body) = send(&app, follow()).await;
    assert_eq!(body["status"], "unfollowed");
    assert_eq!(body["following"], json!([]));
}

// --- Error surface and headers ---

#[tokio::test]
async fn store_failure_is_generic_500() {
    let app = test_app();
    app.store.fail_next();

    let (status, body) = send(&app, request("GET", "/api/posts", None, None)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
}

#[tokio::test]
async fn malformed_json_body_uses_error_envelope() {
    let app = test_app();
    let req = Request::builder()
        .method("POST")
        .uri("/api/users/register")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
}

#[tokio::test]
async fn missing_content_type_uses_error_envelope() {
    let app = test_app();
    let token = signed_in(&app, "alice@example.com").await;
    let req = Request::builder()
        .method("POST")
        .uri("/api/posts")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(json!({ "title": "Hello" }).to_string()))
        .unwrap();

    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn responses_carry_security_headers() {
    let app = test_app();
    let response = router(app.state.clone())
        .oneshot(request("GET", "/api/posts", None, None))
        .await
        .unwrap();
    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert!(headers.get("strict-transport-security").is_none());
}
