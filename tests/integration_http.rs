use axum::Router;
use axum::body::{to_bytes, Body};
use http::{header, Request, StatusCode};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;

use atrium::config::Config;
use atrium::models::user::{Permission, PermissionSet, ALL_PERMISSIONS};
use atrium::routes;
use atrium::services::users;
use atrium::state::{AppState, SessionStore};

fn test_config() -> Config {
    Config {
        database_path: ":memory:".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        session_duration_hours: 2,
        admin_password: None,
        vision_endpoint: None,
        vision_api_key: None,
        vision_deployment: "gpt-4o".to_string(),
        vision_api_version: "2024-02-01".to_string(),
        vision_timeout_secs: 5,
    }
}

/// One connection: every new in-memory SQLite connection would
/// otherwise be a fresh, empty database.
async fn test_state() -> AppState {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");
    atrium::db::MIGRATOR.run(&pool).await.expect("migrations");

    AppState {
        db: pool,
        sessions: SessionStore::new(),
        config: test_config(),
        http: reqwest::Client::new(),
    }
}

/// Logs in and returns the combined cookie header plus the CSRF token.
async fn login(app: &Router, username: &str, password: &str) -> (String, String) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({"username": username, "password": password}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK, "login failed");

    let cookies: Vec<String> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().split(';').next().unwrap().to_string())
        .collect();
    let csrf_token = cookies
        .iter()
        .find_map(|c| c.strip_prefix("csrf_token="))
        .expect("csrf_token cookie not set")
        .to_string();

    (cookies.join("; "), csrf_token)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn login_session_and_calendar_flow() {
    let state = test_state().await;
    users::create_user(
        &state.db,
        "alice",
        "Password123",
        PermissionSet::new([Permission::Calendar]),
    )
    .await
    .unwrap();
    let app = routes::router(state);

    let (cookies, csrf_token) = login(&app, "alice", "Password123").await;

    // Identity is visible on the session endpoint.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/session")
                .header(header::COOKIE, &cookies)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let session = body_json(response).await;
    assert_eq!(session["username"], "alice");
    assert_eq!(session["pages"], json!(["calendar"]));

    // Create an event through the gated calendar group.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/calendar/events")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::COOKIE, &cookies)
                .header("x-csrf-token", &csrf_token)
                .body(Body::from(
                    json!({
                        "title": "Standup",
                        "start_ts": "2024-01-01T09:00:00Z",
                        "end_ts": "2024-01-01T09:15:00Z"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["owner"], "alice");
    assert_eq!(created["source"], "manual");

    // The listing window finds it.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/calendar/events?from=2024-01-01T00:00:00Z&to=2024-01-02T00:00:00Z")
                .header(header::COOKIE, &cookies)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed = body_json(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["title"], "Standup");

    // Export answers ICS.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/calendar/events/export")
                .header(header::COOKIE, &cookies)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/calendar"));
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let ics = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(ics.contains("SUMMARY:Standup"));

    // Logout invalidates the session.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/logout")
                .header(header::COOKIE, &cookies)
                .header("x-csrf-token", &csrf_token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/session")
                .header(header::COOKIE, &cookies)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn gate_denies_pages_outside_the_permission_set() {
    let state = test_state().await;
    users::create_user(
        &state.db,
        "alice",
        "Password123",
        PermissionSet::new([Permission::Calendar]),
    )
    .await
    .unwrap();
    users::create_user(
        &state.db,
        "root",
        "Password123",
        PermissionSet::new([Permission::Admin]),
    )
    .await
    .unwrap();
    let app = routes::router(state);

    let (cookies, _) = login(&app, "alice", "Password123").await;

    for uri in ["/api/admin/users", "/api/images"] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .header(header::COOKIE, &cookies)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{uri}");
        let body = body_json(response).await;
        assert_eq!(body["error"], "Access denied");
    }

    // Admin implicitly reaches every page.
    let (cookies, _) = login(&app, "root", "Password123").await;
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/images")
                .header(header::COOKIE, &cookies)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn mutations_require_the_session_csrf_token() {
    let state = test_state().await;
    users::create_user(
        &state.db,
        "alice",
        "Password123",
        PermissionSet::new([Permission::Calendar]),
    )
    .await
    .unwrap();
    let app = routes::router(state);

    let (cookies, csrf_token) = login(&app, "alice", "Password123").await;
    let payload = json!({
        "title": "Standup",
        "start_ts": "2024-01-01T09:00:00Z",
        "end_ts": "2024-01-01T09:15:00Z"
    })
    .to_string();

    let attempt = |token: Option<&str>| {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/calendar/events")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::COOKIE, &cookies);
        if let Some(token) = token {
            builder = builder.header("x-csrf-token", token);
        }
        builder.body(Body::from(payload.clone())).unwrap()
    };

    let response = app.clone().oneshot(attempt(None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.clone().oneshot(attempt(Some("bogus"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(attempt(Some(csrf_token.as_str())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn bad_credentials_and_missing_sessions_answer_unauthorized() {
    let state = test_state().await;
    users::create_user(
        &state.db,
        "alice",
        "Password123",
        PermissionSet::new([Permission::Calendar]),
    )
    .await
    .unwrap();
    let app = routes::router(state);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({"username": "alice", "password": "wrong"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    // Wrong user and wrong password answer identically.
    assert_eq!(body["error"], "Invalid username or password");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/calendar/events")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_manages_users_over_http() {
    let state = test_state().await;
    users::create_user(
        &state.db,
        "root",
        "Password123",
        PermissionSet::new(ALL_PERMISSIONS),
    )
    .await
    .unwrap();
    let app = routes::router(state);

    let (cookies, csrf_token) = login(&app, "root", "Password123").await;

    // Create a calendar-only user.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/admin/users")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::COOKIE, &cookies)
                .header("x-csrf-token", &csrf_token)
                .body(Body::from(
                    json!({
                        "username": "bob",
                        "password": "Password456",
                        "permissions": ["calendar"]
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // Deleting the sole admin is refused.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/admin/users/root")
                .header(header::COOKIE, &cookies)
                .header("x-csrf-token", &csrf_token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Promote bob, then the first admin may go.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/admin/users/bob/permissions")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::COOKIE, &cookies)
                .header("x-csrf-token", &csrf_token)
                .body(Body::from(json!({"permissions": ["admin"]}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["permissions"], json!(["admin"]));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/admin/users/root")
                .header(header::COOKIE, &cookies)
                .header("x-csrf-token", &csrf_token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let stats = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/admin/stats")
                .header(header::COOKIE, &cookies)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(stats.status(), StatusCode::OK);
    let stats = body_json(stats).await;
    assert_eq!(stats["total_users"], 1);
    assert_eq!(stats["admin_users"], 1);
}
