use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state, Next},
    routing::{delete, get, post, put},
};
use http::{Method, header};
use std::time::Duration;
use tower_cookies::CookieManagerLayer;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::{
    handlers, middleware_layer,
    models::user::Permission,
    state::AppState,
};

/// The request body cap; large enough for uploaded calendar photos.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Builds the application router: route groups, gates, and layers.
///
/// Per-group guards run outside-in: session check, then the page gate,
/// then CSRF verification on mutating methods.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            "http://localhost:3000".parse().unwrap(),
            "http://127.0.0.1:3000".parse().unwrap(),
        ])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::COOKIE,
            "x-csrf-token".parse().unwrap(),
        ])
        .allow_credentials(true)
        .expose_headers(["x-csrf-token".parse().unwrap()])
        .max_age(Duration::from_secs(86400));

    let login_routes = Router::new()
        .route("/api/auth/login", post(handlers::auth::login))
        .with_state(state.clone());

    let account_routes = Router::new()
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/auth/session", get(handlers::auth::session_info))
        .route("/api/pages", get(handlers::pages::list_pages))
        .route_layer(from_fn(middleware_layer::csrf::verify_csrf))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_auth,
        ))
        .with_state(state.clone());

    let calendar_routes = Router::new()
        .route("/api/calendar/events", get(handlers::events::list_events))
        .route("/api/calendar/events", post(handlers::events::create_event))
        .route(
            "/api/calendar/events/export",
            get(handlers::events::export_ics),
        )
        .route(
            "/api/calendar/events/{event_id}",
            put(handlers::events::update_event),
        )
        .route(
            "/api/calendar/events/{event_id}",
            delete(handlers::events::delete_event),
        )
        .route_layer(from_fn(middleware_layer::csrf::verify_csrf))
        .route_layer(from_fn(|req: axum::extract::Request, next: Next| {
            middleware_layer::permission::require_page(Permission::Calendar, req, next)
        }))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_auth,
        ))
        .with_state(state.clone());

    let image_routes = Router::new()
        .route("/api/images", get(handlers::pages::image_generator_page))
        .route_layer(from_fn(|req: axum::extract::Request, next: Next| {
            middleware_layer::permission::require_page(Permission::ImageGenerator, req, next)
        }))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_auth,
        ))
        .with_state(state.clone());

    let admin_routes = Router::new()
        .route("/api/admin/users", get(handlers::users::list_users))
        .route("/api/admin/users", post(handlers::users::create_user))
        .route(
            "/api/admin/users/{username}/permissions",
            put(handlers::users::update_permissions),
        )
        .route(
            "/api/admin/users/{username}",
            delete(handlers::users::delete_user),
        )
        .route("/api/admin/stats", get(handlers::users::stats))
        .route("/api/admin/extractions", post(handlers::vision::extract))
        .route(
            "/api/admin/extractions/confirm",
            post(handlers::vision::confirm),
        )
        .route_layer(from_fn(middleware_layer::csrf::verify_csrf))
        .route_layer(from_fn(|req: axum::extract::Request, next: Next| {
            middleware_layer::permission::require_page(Permission::Admin, req, next)
        }))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_auth,
        ))
        .with_state(state.clone());

    Router::new()
        .merge(login_routes)
        .merge(account_routes)
        .merge(calendar_routes)
        .merge(image_routes)
        .merge(admin_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default())
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .layer(CookieManagerLayer::new())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .fallback_service(ServeDir::new("public"))
}
