use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::state::AppState;

/// Extracts the session token from the request cookies.
///
/// # Arguments
///
/// * `cookies` - The request cookies.
///
/// # Returns
///
/// An `Option` containing the session ID if found.
fn extract_session_token(cookies: &Cookies) -> Option<Uuid> {
    cookies
        .get("session_id")
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
}

/// A middleware that requires a live session to be present.
///
/// On success the `Session` is inserted as a request extension for the
/// inner middleware and handlers. An expired session is evicted by the
/// store lookup and answered like a missing one.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `cookies` - The request cookies.
/// * `request` - The incoming request.
/// * `next` - The next middleware in the chain.
///
/// # Returns
///
/// A `Response` or an error `StatusCode`.
pub async fn require_auth(
    State(state): State<AppState>,
    cookies: Cookies,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    tracing::debug!("🔐 Checking authentication...");

    let session_id = extract_session_token(&cookies).ok_or_else(|| {
        tracing::warn!("❌ No session_id cookie found");
        StatusCode::UNAUTHORIZED
    })?;

    let session = state.sessions.get(&session_id).await.ok_or_else(|| {
        tracing::warn!("❌ Session missing or expired: {}", session_id);
        StatusCode::UNAUTHORIZED
    })?;

    tracing::debug!("✅ User authenticated: {}", session.username);

    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}
