use axum::{
    body::Body,
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{error::AppError, models::session::Session, models::user::Permission};

/// A middleware guard that requires the session to allow a page.
///
/// Runs inside `require_auth`. Pure lookup against the permission set
/// captured at login; a denial renders the fixed "access denied"
/// response rather than raising.
///
/// # Arguments
///
/// * `page` - The page the wrapped routes belong to.
/// * `request` - The incoming request.
/// * `next` - The next middleware in the chain.
///
/// # Returns
///
/// A `Response`.
pub async fn require_page(page: Permission, request: Request<Body>, next: Next) -> Response {
    match request.extensions().get::<Session>() {
        Some(session) if session.permissions.allows(page) => next.run(request).await,
        Some(session) => {
            tracing::warn!("🚫 {} denied access to the {} page", session.username, page);
            AppError::Unauthorized.into_response()
        }
        None => {
            tracing::warn!("🚫 Page gate reached without a session");
            AppError::Unauthorized.into_response()
        }
    }
}
