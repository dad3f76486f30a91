use axum::{
    body::Body,
    extract::Request,
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{error::AppError, models::session::Session};

/// A middleware that verifies the CSRF token on mutating requests.
///
/// Runs inside `require_auth`: the token presented in the
/// `x-csrf-token` header must match the one issued with the session.
/// Read-only methods are exempt.
///
/// # Arguments
///
/// * `req` - The incoming request.
/// * `next` - The next middleware in the chain.
///
/// # Returns
///
/// A `Response`.
pub async fn verify_csrf(req: Request<Body>, next: Next) -> Response {
    if req.method() == Method::GET
        || req.method() == Method::HEAD
        || req.method() == Method::OPTIONS
    {
        tracing::debug!("✅ CSRF exemption: {} request", req.method());
        return next.run(req).await;
    }

    let session_token = match req.extensions().get::<Session>() {
        Some(session) => session.csrf_token.clone(),
        None => {
            tracing::warn!("❌ CSRF check reached without an authenticated session");
            return AppError::Unauthorized.into_response();
        }
    };

    let header_token = req
        .headers()
        .get("x-csrf-token")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    match header_token {
        Some(token) if token == session_token => {
            tracing::debug!("✅ CSRF token verified");
            next.run(req).await
        }
        Some(_) => {
            tracing::warn!("❌ CSRF: header token does not match the session token");
            AppError::Unauthorized.into_response()
        }
        None => {
            tracing::warn!("❌ CSRF: x-csrf-token header missing");
            AppError::Unauthorized.into_response()
        }
    }
}
