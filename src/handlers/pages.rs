use axum::{Extension, Json};
use serde::Serialize;

use crate::models::session::Session;
use crate::models::user::Permission;

/// The response payload listing the pages the identity may open.
#[derive(Serialize)]
pub struct PagesResponse {
    pub pages: Vec<Permission>,
}

/// Lists the pages the current session may navigate to.
#[axum::debug_handler]
pub async fn list_pages(Extension(session): Extension<Session>) -> Json<PagesResponse> {
    Json(PagesResponse {
        pages: session.permissions.accessible_pages(),
    })
}

/// The image generator page shell.
#[derive(Serialize)]
pub struct ImagePageResponse {
    pub page: Permission,
    pub available: bool,
}

/// Answers for the image generator page.
///
/// The page's pixel operations live entirely in the frontend; the
/// backend only gates navigation to it.
#[axum::debug_handler]
pub async fn image_generator_page(
    Extension(session): Extension<Session>,
) -> Json<ImagePageResponse> {
    tracing::debug!("🎨 {} opened the image generator page", session.username);
    Json(ImagePageResponse {
        page: Permission::ImageGenerator,
        available: true,
    })
}
