use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use gavel::config::Config;
use http_body_util::BodyExt;
use tower::ServiceExt;

async fn spawn_app() -> Router {
    let mut config = Config::default();
    config.database.path = "sqlite::memory:".to_string();
    // A single pooled connection so every request sees the same
    // in-memory database
    config.database.max_connections = 1;
    config.database.min_connections = 1;

    let state = gavel::api::create_app_state_from_config(config)
        .await
        .expect("Failed to create app state");
    gavel::api::router(state).await
}

/// App backed by a file database with a real connection pool, for tests
/// where transactions must genuinely overlap instead of serializing at
/// a single pooled connection.
async fn spawn_pooled_app() -> Router {
    static COUNTER: std::sync::atomic::AtomicU32 = std::sync::atomic::AtomicU32::new(0);
    let n = COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    let db_path = std::env::temp_dir().join(format!("gavel_test_{}_{n}.db", std::process::id()));
    let _ = std::fs::remove_file(&db_path);

    let mut config = Config::default();
    config.database.path = format!("sqlite:{}", db_path.display());
    config.database.max_connections = 5;
    config.database.min_connections = 1;

    let state = gavel::api::create_app_state_from_config(config)
        .await
        .expect("Failed to create app state");
    gavel::api::router(state).await
}

fn session_cookie(response: &Response) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .expect("missing session cookie")
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string()
}

async fn json_body(response: Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

/// Register a user and return their session cookie.
async fn register(app: &Router, username: &str) -> String {
    let payload = serde_json::json!({
        "username": username,
        "email": format!("{username}@example.com"),
        "password": "hunter2hunter2",
        "confirmation": "hunter2hunter2",
    });

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/register")
                .header("Content-Type", mime::APPLICATION_JSON.as_ref())
                .body(Body::from(serde_json::to_string(&payload).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    session_cookie(&response)
}

/// Create a listing as the given session and return its id.
async fn create_listing(app: &Router, cookie: &str, title: &str, starting_bid: f64) -> i64 {
    let payload = serde_json::json!({
        "title": title,
        "description": "A test listing",
        "starting_bid": starting_bid,
        "category": "Electronics",
    });

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/create")
                .header(header::COOKIE, cookie)
                .header("Content-Type", mime::APPLICATION_JSON.as_ref())
                .body(Body::from(serde_json::to_string(&payload).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    body["data"]["id"].as_i64().unwrap()
}

async fn place_bid(app: &Router, cookie: &str, listing_id: i64, amount: f64) -> Response {
    let payload = serde_json::json!({ "amount": amount });
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/bid/{listing_id}"))
                .header(header::COOKIE, cookie)
                .header("Content-Type", mime::APPLICATION_JSON.as_ref())
                .body(Body::from(serde_json::to_string(&payload).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn get_detail(app: &Router, listing_id: i64) -> serde_json::Value {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/listings/{listing_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    json_body(response).await
}

#[tokio::test]
async fn test_health() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_protected_routes_require_login() {
    let app = spawn_app().await;

    for (method, uri) in [
        ("POST", "/api/create"),
        ("POST", "/api/bid/1"),
        ("POST", "/api/close/1"),
        ("POST", "/api/comment/1"),
        ("GET", "/api/mylistings"),
        ("GET", "/api/watchlist"),
        ("GET", "/api/auth/me"),
    ] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
    }
}

#[tokio::test]
async fn test_register_login_me() {
    let app = spawn_app().await;
    let cookie = register(&app, "alice").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["username"], "alice");

    // Fresh login works
    let payload = serde_json::json!({ "username": "alice", "password": "hunter2hunter2" });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .header("Content-Type", mime::APPLICATION_JSON.as_ref())
                .body(Body::from(serde_json::to_string(&payload).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Wrong password does not
    let payload = serde_json::json!({ "username": "alice", "password": "wrong-password" });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .header("Content-Type", mime::APPLICATION_JSON.as_ref())
                .body(Body::from(serde_json::to_string(&payload).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_password_mismatch_creates_no_user() {
    let app = spawn_app().await;

    let payload = serde_json::json!({
        "username": "mallory",
        "email": "mallory@example.com",
        "password": "hunter2hunter2",
        "confirmation": "different-entirely",
    });

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/register")
                .header("Content-Type", mime::APPLICATION_JSON.as_ref())
                .body(Body::from(serde_json::to_string(&payload).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);

    // The failed registration must not have created the account
    let payload = serde_json::json!({ "username": "mallory", "password": "hunter2hunter2" });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .header("Content-Type", mime::APPLICATION_JSON.as_ref())
                .body(Body::from(serde_json::to_string(&payload).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_duplicate_username_conflicts() {
    let app = spawn_app().await;
    register(&app, "alice").await;

    let payload = serde_json::json!({
        "username": "alice",
        "email": "other@example.com",
        "password": "hunter2hunter2",
        "confirmation": "hunter2hunter2",
    });

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/register")
                .header("Content-Type", mime::APPLICATION_JSON.as_ref())
                .body(Body::from(serde_json::to_string(&payload).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_create_listing_validation() {
    let app = spawn_app().await;
    let cookie = register(&app, "alice").await;

    for payload in [
        serde_json::json!({ "title": "", "description": "d", "starting_bid": 5.0 }),
        serde_json::json!({ "title": "t", "description": "", "starting_bid": 5.0 }),
        serde_json::json!({ "title": "t", "description": "d", "starting_bid": 0.5 }),
        serde_json::json!({ "title": "t", "description": "d", "starting_bid": -1.0 }),
        serde_json::json!({ "title": "t", "description": "d", "starting_bid": 5.0, "category": "Boats" }),
    ] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/create")
                    .header(header::COOKIE, &cookie)
                    .header("Content-Type", mime::APPLICATION_JSON.as_ref())
                    .body(Body::from(serde_json::to_string(&payload).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{payload}");
    }
}

#[tokio::test]
async fn test_multibyte_title_at_limit_accepted() {
    let app = spawn_app().await;
    let cookie = register(&app, "alice").await;

    // 100 characters, well over 100 bytes
    let title = "é".repeat(100);
    let id = create_listing(&app, &cookie, &title, 5.0).await;

    let detail = get_detail(&app, id).await;
    assert_eq!(detail["data"]["title"], title);
}

#[tokio::test]
async fn test_listing_appears_on_index_and_detail() {
    let app = spawn_app().await;
    let cookie = register(&app, "alice").await;
    let id = create_listing(&app, &cookie, "Vintage lamp", 10.0).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/listings")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let titles: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["title"].as_str().unwrap())
        .collect();
    assert!(titles.contains(&"Vintage lamp"));

    let detail = get_detail(&app, id).await;
    assert_eq!(detail["data"]["title"], "Vintage lamp");
    assert_eq!(detail["data"]["creator"], "alice");
    assert_eq!(detail["data"]["active"], true);
    assert_eq!(detail["data"]["current_bid"], serde_json::Value::Null);
    assert_eq!(detail["data"]["bid_count"], 0);
}

#[tokio::test]
async fn test_listing_not_found() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/listings/9999")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bid_lifecycle_scenario() {
    let app = spawn_app().await;
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;
    let carol = register(&app, "carol").await;

    let id = create_listing(&app, &alice, "Old radio", 1.0).await;

    // Bid below the starting bid is rejected
    let response = place_bid(&app, &bob, id, 1.0).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = place_bid(&app, &bob, id, 5.0).await;
    assert_eq!(response.status(), StatusCode::OK);
    let detail = get_detail(&app, id).await;
    assert_eq!(detail["data"]["current_bid"], 5.0);

    // Lower than the leading bid is rejected and changes nothing
    let response = place_bid(&app, &carol, id, 3.0).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let detail = get_detail(&app, id).await;
    assert_eq!(detail["data"]["current_bid"], 5.0);

    let response = place_bid(&app, &bob, id, 10.0).await;
    assert_eq!(response.status(), StatusCode::OK);
    let detail = get_detail(&app, id).await;
    assert_eq!(detail["data"]["current_bid"], 10.0);
    assert_eq!(detail["data"]["bid_count"], 2);

    // Close by the owner; winner is the bidder of the highest amount
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/close/{id}"))
                .header(header::COOKIE, &alice)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["winner"], "bob");

    let detail = get_detail(&app, id).await;
    assert_eq!(detail["data"]["active"], false);
    assert_eq!(detail["data"]["winner"], "bob");

    // Closing again is a no-op reporting the same winner
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/close/{id}"))
                .header(header::COOKIE, &alice)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["winner"], "bob");

    // Bids on a closed auction are rejected
    let response = place_bid(&app, &carol, id, 50.0).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_close_requires_ownership() {
    let app = spawn_app().await;
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;

    let id = create_listing(&app, &alice, "Old radio", 1.0).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/close/{id}"))
                .header(header::COOKIE, &bob)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Still open
    let detail = get_detail(&app, id).await;
    assert_eq!(detail["data"]["active"], true);
}

#[tokio::test]
async fn test_close_without_bids_has_no_winner() {
    let app = spawn_app().await;
    let alice = register(&app, "alice").await;
    let id = create_listing(&app, &alice, "Unwanted vase", 1.0).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/close/{id}"))
                .header(header::COOKIE, &alice)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["winner"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_concurrent_equal_bids_accept_at_most_one() {
    // Pooled connections so the two bid transactions actually contend
    // for the row instead of queueing on one connection
    let app = spawn_pooled_app().await;
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;
    let carol = register(&app, "carol").await;

    let id = create_listing(&app, &alice, "Contested lamp", 5.0).await;

    let (r1, r2) = tokio::join!(
        place_bid(&app, &bob, id, 10.0),
        place_bid(&app, &carol, id, 10.0)
    );

    let statuses = [r1.status(), r2.status()];
    let successes = statuses.iter().filter(|s| **s == StatusCode::OK).count();
    assert_eq!(successes, 1, "{statuses:?}");
    // The losing bid is rejected as too low, not dropped with an error
    assert!(statuses.contains(&StatusCode::BAD_REQUEST), "{statuses:?}");

    let detail = get_detail(&app, id).await;
    assert_eq!(detail["data"]["current_bid"], 10.0);
    assert_eq!(detail["data"]["bid_count"], 1);
}

#[tokio::test]
async fn test_watchlist_flow() {
    let app = spawn_app().await;
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;

    let id = create_listing(&app, &alice, "Watched lamp", 5.0).await;

    let add = |cookie: String| {
        let app = app.clone();
        async move {
            app.oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/watchlist/{id}"))
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
        }
    };

    // First add inserts, second is an idempotent no-op
    let response = add(bob.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["data"], true);

    let response = add(bob.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["data"], false);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/watchlist")
                .header(header::COOKIE, &bob)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["title"], "Watched lamp");

    // Remove twice: removed, then no-op
    for expected in [true, false] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/watchlist/{id}"))
                    .header(header::COOKIE, &bob)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["data"], expected);
    }

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/watchlist")
                .header(header::COOKIE, &bob)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = json_body(response).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    // Watching a missing listing is a 404
    let response = add_missing(&app, &bob).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

async fn add_missing(app: &Router, cookie: &str) -> Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/watchlist/9999")
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn test_comments() {
    let app = spawn_app().await;
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;

    let id = create_listing(&app, &alice, "Commented lamp", 5.0).await;

    // Empty comment rejected
    let payload = serde_json::json!({ "text": "   " });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/comment/{id}"))
                .header(header::COOKIE, &bob)
                .header("Content-Type", mime::APPLICATION_JSON.as_ref())
                .body(Body::from(serde_json::to_string(&payload).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    for text in ["First!", "Does it still work?"] {
        let payload = serde_json::json!({ "text": text });
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/comment/{id}"))
                    .header(header::COOKIE, &bob)
                    .header("Content-Type", mime::APPLICATION_JSON.as_ref())
                    .body(Body::from(serde_json::to_string(&payload).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    // Comments come back in insertion order with authors
    let detail = get_detail(&app, id).await;
    let comments = detail["data"]["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0]["text"], "First!");
    assert_eq!(comments[0]["author"], "bob");
    assert_eq!(comments[1]["text"], "Does it still work?");

    // Commenting on a missing listing is a 404
    let payload = serde_json::json!({ "text": "hello" });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/comment/9999")
                .header(header::COOKIE, &bob)
                .header("Content-Type", mime::APPLICATION_JSON.as_ref())
                .body(Body::from(serde_json::to_string(&payload).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_categories() {
    let app = spawn_app().await;
    let alice = register(&app, "alice").await;
    create_listing(&app, &alice, "Gadget", 5.0).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/categories")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(
        body["data"],
        serde_json::json!(["Auto", "Toys", "Electronics", "Fashion", "Home"])
    );

    // The helper files every listing under Electronics
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/categories/Electronics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/categories/Home")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = json_body(response).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/categories/Boats")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_mylistings_scoped_to_owner() {
    let app = spawn_app().await;
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;

    create_listing(&app, &alice, "Alice's lamp", 5.0).await;
    create_listing(&app, &bob, "Bob's radio", 5.0).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/mylistings")
                .header(header::COOKIE, &alice)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let body = json_body(response).await;
    let titles: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Alice's lamp"]);
}
