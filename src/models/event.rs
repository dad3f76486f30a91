use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a calendar event entered the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventSource {
    /// Entered by hand on the calendar page.
    Manual,
    /// Extracted from an uploaded image and confirmed by an admin.
    AiExtracted,
}

impl EventSource {
    /// Returns the tag stored in the `source` column for this variant.
    pub fn as_tag(&self) -> &'static str {
        match self {
            EventSource::Manual => "manual",
            EventSource::AiExtracted => "ai-extracted",
        }
    }

    /// Parses the tag stored in the `source` column.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "manual" => Some(EventSource::Manual),
            "ai-extracted" => Some(EventSource::AiExtracted),
            _ => None,
        }
    }
}

/// Represents a calendar event.
#[derive(Debug, Clone, Serialize)]
pub struct CalendarEvent {
    /// The unique identifier for the event. Immutable once created.
    pub id: Uuid,
    /// The username that owns the event.
    pub owner: String,
    /// The event title.
    pub title: String,
    /// The start of the event, UTC. Invariant: `start_ts <= end_ts`.
    pub start_ts: DateTime<Utc>,
    /// The end of the event, UTC.
    pub end_ts: DateTime<Utc>,
    /// Free-form details.
    pub description: Option<String>,
    /// Where the event takes place.
    pub location: Option<String>,
    /// How the event entered the system.
    pub source: EventSource,
    /// The timestamp when the event was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the event was last updated.
    pub updated_at: DateTime<Utc>,
}
