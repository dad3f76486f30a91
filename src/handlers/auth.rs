use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use tower_cookies::{Cookies, Cookie};
use tower_cookies::cookie::time::Duration;
use uuid::Uuid;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::{
    error::Result,
    models::session::Session,
    models::user::{Permission, PermissionSet},
    services::auth as auth_service,
    state::AppState,
    validation::auth::*,
};

/// The request payload for user login.
#[derive(Deserialize, Debug)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// The response payload for authentication-related requests.
#[derive(Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
}

/// The response payload describing the current session.
#[derive(Serialize)]
pub struct SessionResponse {
    pub username: String,
    pub permissions: PermissionSet,
    pub pages: Vec<Permission>,
    pub expires_at: DateTime<Utc>,
}

/// Creates a secure cookie with the given name, value, and max age.
fn create_secure_cookie(name: String, value: String, max_age_hours: i64) -> Cookie<'static> {
    let mut cookie = Cookie::new(name.clone(), value);

    let is_production = std::env::var("APP_ENV")
        .unwrap_or_else(|_| "development".to_string()) == "production";

    if name != "csrf_token" {
        cookie.set_http_only(true);
    }

    if is_production {
        cookie.set_secure(true);
    }

    cookie.set_same_site(tower_cookies::cookie::SameSite::Lax);
    cookie.set_max_age(Duration::seconds(max_age_hours * 3600));
    cookie.set_path("/");

    cookie
}

/// Handles user login.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<LoginRequest>,
) -> Result<Response> {
    tracing::info!("🔐 Login attempt: {}", payload.username);
    validate_username(&payload.username)?;

    let identity =
        auth_service::authenticate(&state.db, &payload.username, &payload.password).await?;

    let session_id = Uuid::new_v4();
    tracing::debug!("🔑 Generated session_id: {}", session_id);

    let csrf_token = crate::crypto::csrf::generate_csrf_token();

    let session = Session {
        username: identity.username.clone(),
        permissions: identity.permissions,
        csrf_token: csrf_token.clone(),
        created_at: Utc::now(),
        expires_at: Utc::now() + chrono::Duration::hours(state.config.session_duration_hours),
    };

    state.sessions.insert(session_id, session).await;
    tracing::info!("✅ Session stored: {}", session_id);

    let session_cookie = create_secure_cookie(
        "session_id".to_string(),
        session_id.to_string(),
        state.config.session_duration_hours,
    );
    cookies.add(session_cookie);

    let csrf_cookie = create_secure_cookie(
        "csrf_token".to_string(),
        csrf_token,
        state.config.session_duration_hours,
    );
    cookies.add(csrf_cookie);

    tracing::info!("✅ Session and CSRF cookies added");
    tracing::info!("✅ User logged in: {}", identity.username);

    let response = AuthResponse {
        success: true,
        message: "Login successful".to_string(),
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Handles user logout.
#[axum::debug_handler]
pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    cookies: Cookies,
) -> Result<Response> {
    tracing::info!("👋 Logout for user: {}", session.username);

    if let Some(session_id) = cookies
        .get("session_id")
        .and_then(|c| Uuid::parse_str(c.value()).ok())
    {
        state.sessions.remove(&session_id).await;
        tracing::info!("✅ Session removed from store");
    }

    let mut session_cookie = Cookie::new("session_id", "");
    session_cookie.set_max_age(Duration::seconds(0));
    session_cookie.set_path("/");
    cookies.remove(session_cookie);

    let mut csrf_cookie = Cookie::new("csrf_token", "");
    csrf_cookie.set_max_age(Duration::seconds(0));
    csrf_cookie.set_path("/");
    cookies.remove(csrf_cookie);

    tracing::info!("✅ User logged out: {}", session.username);

    let response = AuthResponse {
        success: true,
        message: "Logout successful".to_string(),
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Describes the current session's identity.
#[axum::debug_handler]
pub async fn session_info(Extension(session): Extension<Session>) -> Json<SessionResponse> {
    Json(SessionResponse {
        username: session.username.clone(),
        pages: session.permissions.accessible_pages(),
        permissions: session.permissions,
        expires_at: session.expires_at,
    })
}
