use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::Result,
    models::event::EventSource,
    models::session::Session,
    services::events::{self as event_service, EventInput},
    state::AppState,
};

/// The request payload for creating or replacing an event.
#[derive(Deserialize, Debug)]
pub struct EventPayload {
    pub title: String,
    pub start_ts: DateTime<Utc>,
    pub end_ts: DateTime<Utc>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl From<EventPayload> for EventInput {
    fn from(payload: EventPayload) -> Self {
        Self {
            title: payload.title,
            start_ts: payload.start_ts,
            end_ts: payload.end_ts,
            description: payload.description,
            location: payload.location,
        }
    }
}

/// The query parameters for listing and exporting events.
#[derive(Deserialize, Debug)]
pub struct EventWindowQuery {
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

impl EventWindowQuery {
    /// Missing bounds widen to the whole representable calendar.
    ///
    /// Bounds stay within four-digit years so their stored text form
    /// compares chronologically.
    fn window(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            self.from
                .unwrap_or_else(|| Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0).unwrap()),
            self.to
                .unwrap_or_else(|| Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).unwrap()),
        )
    }
}

/// Lists the events intersecting the requested window.
#[axum::debug_handler]
pub async fn list_events(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<EventWindowQuery>,
) -> Result<Response> {
    let (from, to) = query.window();
    let events = event_service::list_events(
        &state.db,
        &session.identity(),
        query.owner.as_deref(),
        from,
        to,
    )
    .await?;

    Ok(Json(events).into_response())
}

/// Creates a manually entered event.
#[axum::debug_handler]
pub async fn create_event(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(payload): Json<EventPayload>,
) -> Result<Response> {
    let event = event_service::create_event(
        &state.db,
        &session.username,
        payload.into(),
        EventSource::Manual,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(event)).into_response())
}

/// Replaces an event's mutable fields.
#[axum::debug_handler]
pub async fn update_event(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(event_id): Path<Uuid>,
    Json(payload): Json<EventPayload>,
) -> Result<Response> {
    let event = event_service::update_event(
        &state.db,
        &session.identity(),
        &event_id,
        payload.into(),
    )
    .await?;

    Ok(Json(event).into_response())
}

/// The response payload for delete operations.
#[derive(Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

/// Deletes an event.
#[axum::debug_handler]
pub async fn delete_event(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(event_id): Path<Uuid>,
) -> Result<Response> {
    event_service::delete_event(&state.db, &session.identity(), &event_id).await?;

    Ok(Json(ActionResponse {
        success: true,
        message: "Event deleted".to_string(),
    })
    .into_response())
}

/// Serves the filtered event list as an ICS download.
#[axum::debug_handler]
pub async fn export_ics(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<EventWindowQuery>,
) -> Result<Response> {
    let (from, to) = query.window();
    let ics = event_service::export_ics(
        &state.db,
        &session.identity(),
        query.owner.as_deref(),
        from,
        to,
    )
    .await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"calendar.ics\"",
            ),
        ],
        ics,
    )
        .into_response())
}
