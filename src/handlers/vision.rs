use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, Result},
    models::event::{CalendarEvent, EventSource},
    models::extraction::ExtractionCandidate,
    models::session::Session,
    services::events::{self as event_service, EventInput},
    services::vision as vision_service,
    state::AppState,
};

/// The response payload for an extraction run.
#[derive(Serialize)]
pub struct ExtractionResponse {
    pub candidates: Vec<ExtractionCandidate>,
    /// Set when the service answered successfully but found nothing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// One candidate the admin confirmed, with corrected timestamps.
#[derive(Deserialize, Debug)]
pub struct ConfirmedEvent {
    pub title: String,
    pub start_ts: DateTime<Utc>,
    pub end_ts: DateTime<Utc>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// The request payload for persisting confirmed candidates.
#[derive(Deserialize, Debug)]
pub struct ConfirmEventsRequest {
    pub events: Vec<ConfirmedEvent>,
}

/// Runs vision extraction over one uploaded image.
///
/// Nothing is persisted here: the candidates go back to the admin for
/// review, and only `confirm` turns them into event rows.
#[axum::debug_handler]
pub async fn extract(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    mut multipart: Multipart,
) -> Result<Response> {
    let mut image_bytes = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Multipart(e.to_string()))?
    {
        if field.name() == Some("image") {
            image_bytes = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Multipart(e.to_string()))?,
            );
        }
    }

    let image_bytes =
        image_bytes.ok_or_else(|| AppError::Multipart("Missing 'image' field".to_string()))?;

    if image_bytes.is_empty() {
        return Err(AppError::Validation("Uploaded image is empty".to_string()));
    }

    let kind = infer::get(&image_bytes)
        .filter(|t| t.matcher_type() == infer::MatcherType::Image)
        .ok_or_else(|| AppError::Validation("Uploaded file is not an image".to_string()))?;

    tracing::info!(
        "📷 {} uploaded {} bytes ({}) for extraction",
        session.username,
        image_bytes.len(),
        kind.mime_type()
    );

    let candidates =
        vision_service::extract_events(&state.http, &state.config, &image_bytes).await?;

    let message = if candidates.is_empty() {
        Some("No events found in the image".to_string())
    } else {
        None
    };

    Ok((StatusCode::OK, Json(ExtractionResponse { candidates, message })).into_response())
}

/// Persists the candidates the admin confirmed.
#[axum::debug_handler]
pub async fn confirm(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(payload): Json<ConfirmEventsRequest>,
) -> Result<Response> {
    if payload.events.is_empty() {
        return Err(AppError::Validation(
            "No confirmed events to save".to_string(),
        ));
    }

    let mut created: Vec<CalendarEvent> = Vec::with_capacity(payload.events.len());
    for confirmed in payload.events {
        let event = event_service::create_event(
            &state.db,
            &session.username,
            EventInput {
                title: confirmed.title,
                start_ts: confirmed.start_ts,
                end_ts: confirmed.end_ts,
                description: confirmed.description,
                location: confirmed.location,
            },
            EventSource::AiExtracted,
        )
        .await?;
        created.push(event);
    }

    tracing::info!(
        "✅ {} confirmed {} extracted events",
        session.username,
        created.len()
    );

    Ok((StatusCode::CREATED, Json(created)).into_response())
}
