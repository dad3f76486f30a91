//! ICS export of calendar events (RFC 5545 subset).

use icalendar::{Calendar, Component, EventLike};
use crate::models::event::CalendarEvent;

/// DTSTART/DTEND/DTSTAMP format: UTC with Z suffix.
const ICS_UTC_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Generates ICS text for the given events, one VEVENT per event.
///
/// UID is the event identifier; DTSTART/DTEND are UTC.
pub fn generate(events: &[CalendarEvent]) -> String {
    let mut cal = Calendar::new();

    for event in events {
        cal.push(vevent(event));
    }

    cal.done().to_string()
}

fn vevent(event: &CalendarEvent) -> icalendar::Event {
    let mut ics_event = icalendar::Event::new();
    ics_event.uid(&event.id.to_string());
    ics_event.summary(&event.title);

    // DTSTAMP is required by RFC 5545; the last update is the natural value.
    ics_event.add_property("DTSTAMP", event.updated_at.format(ICS_UTC_FORMAT).to_string());
    ics_event.add_property("DTSTART", event.start_ts.format(ICS_UTC_FORMAT).to_string());
    ics_event.add_property("DTEND", event.end_ts.format(ICS_UTC_FORMAT).to_string());

    if let Some(ref desc) = event.description {
        ics_event.description(desc);
    }

    if let Some(ref loc) = event.location {
        ics_event.location(loc);
    }

    ics_event.done()
}
