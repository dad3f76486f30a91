use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;
use crate::error::{AppError, DataError, Result};
use crate::ics;
use crate::models::event::{CalendarEvent, EventSource};
use crate::models::session::Identity;
use crate::repositories::event as event_repo;

/// The fields a caller supplies when creating or replacing an event.
#[derive(Debug, Clone)]
pub struct EventInput {
    pub title: String,
    pub start_ts: DateTime<Utc>,
    pub end_ts: DateTime<Utc>,
    pub description: Option<String>,
    pub location: Option<String>,
}

fn validate_input(input: &EventInput) -> Result<()> {
    // Zero-duration events are allowed; inverted ranges are not.
    if input.start_ts > input.end_ts {
        return Err(DataError::InvalidRange.into());
    }
    if input.title.trim().is_empty() {
        return Err(AppError::Validation("Event title cannot be empty".to_string()));
    }
    Ok(())
}

/// Fetches an event the identity may modify.
///
/// A missing event and a foreign event answer identically with
/// `EventNotFound`, so event ids cannot be probed across owners.
async fn find_owned(db: &SqlitePool, identity: &Identity, id: &Uuid) -> Result<CalendarEvent> {
    let event = event_repo::find_by_id(db, id)
        .await?
        .ok_or(DataError::EventNotFound)?;

    if event.owner != identity.username && !identity.permissions.is_admin() {
        return Err(DataError::EventNotFound.into());
    }

    Ok(event)
}

/// Creates a new event for the given owner.
///
/// Fails with `DataError::InvalidRange` when start > end.
pub async fn create_event(
    db: &SqlitePool,
    owner: &str,
    input: EventInput,
    source: EventSource,
) -> Result<CalendarEvent> {
    validate_input(&input)?;

    let now = Utc::now();
    let event = CalendarEvent {
        id: Uuid::new_v4(),
        owner: owner.to_string(),
        title: input.title,
        start_ts: input.start_ts,
        end_ts: input.end_ts,
        description: input.description,
        location: input.location,
        source,
        created_at: now,
        updated_at: now,
    };

    event_repo::insert_event(db, &event).await?;
    tracing::info!("✅ Event created: {} ({})", event.id, event.title);

    Ok(event)
}

/// Replaces an event's mutable fields.
///
/// The requester must own the event or be an admin; the id, owner and
/// source never change.
pub async fn update_event(
    db: &SqlitePool,
    identity: &Identity,
    id: &Uuid,
    input: EventInput,
) -> Result<CalendarEvent> {
    validate_input(&input)?;

    let event = find_owned(db, identity, id).await?;
    let updated_at = Utc::now();

    event_repo::update_event(
        db,
        id,
        &input.title,
        input.start_ts,
        input.end_ts,
        input.description.as_deref(),
        input.location.as_deref(),
        updated_at,
    )
    .await?;

    tracing::info!("✅ Event updated: {}", id);

    Ok(CalendarEvent {
        title: input.title,
        start_ts: input.start_ts,
        end_ts: input.end_ts,
        description: input.description,
        location: input.location,
        updated_at,
        ..event
    })
}

/// Deletes an event the identity owns (or any event, for admins).
pub async fn delete_event(db: &SqlitePool, identity: &Identity, id: &Uuid) -> Result<()> {
    find_owned(db, identity, id).await?;
    event_repo::delete_event(db, id).await?;
    tracing::info!("✅ Event deleted: {}", id);
    Ok(())
}

/// Lists the events intersecting the window, ordered by start ascending.
///
/// Non-admins may only list their own events. Admins may scope to any
/// owner, or pass `None` to list everyone's events.
pub async fn list_events(
    db: &SqlitePool,
    identity: &Identity,
    owner: Option<&str>,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<CalendarEvent>> {
    if from > to {
        return Err(DataError::InvalidRange.into());
    }

    let effective_owner = match (identity.permissions.is_admin(), owner) {
        (true, scoped) => scoped,
        (false, None) => Some(identity.username.as_str()),
        (false, Some(o)) if o == identity.username => Some(o),
        (false, Some(_)) => return Err(AppError::Unauthorized),
    };

    event_repo::list_in_range(db, effective_owner, from, to).await
}

/// Serializes the filtered event list into ICS text.
pub async fn export_ics(
    db: &SqlitePool,
    identity: &Identity,
    owner: Option<&str>,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<String> {
    let events = list_events(db, identity, owner, from, to).await?;
    tracing::debug!("📅 Exporting {} events to ICS", events.len());
    Ok(ics::generate(&events))
}
