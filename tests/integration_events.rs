use chrono::{DateTime, TimeZone, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use uuid::Uuid;

use atrium::error::{AppError, DataError};
use atrium::models::event::EventSource;
use atrium::models::session::Identity;
use atrium::models::user::{Permission, PermissionSet};
use atrium::services::events::{self, EventInput};

/// One connection: every new in-memory SQLite connection would
/// otherwise be a fresh, empty database.
async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");
    atrium::db::MIGRATOR.run(&pool).await.expect("migrations");
    pool
}

fn user(name: &str) -> Identity {
    Identity {
        username: name.to_string(),
        permissions: PermissionSet::new([Permission::Calendar]),
    }
}

fn admin(name: &str) -> Identity {
    Identity {
        username: name.to_string(),
        permissions: PermissionSet::new([Permission::Admin]),
    }
}

fn at(day: u32, hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, hour, min, 0).unwrap()
}

fn input(title: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> EventInput {
    EventInput {
        title: title.to_string(),
        start_ts: start,
        end_ts: end,
        description: None,
        location: None,
    }
}

#[tokio::test]
async fn inverted_range_is_rejected() {
    let pool = test_pool().await;

    let err = events::create_event(
        &pool,
        "alice",
        input("Backwards", at(2, 10, 0), at(2, 9, 0)),
        EventSource::Manual,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Data(DataError::InvalidRange)));
}

#[tokio::test]
async fn zero_duration_event_is_allowed() {
    let pool = test_pool().await;

    let event = events::create_event(
        &pool,
        "alice",
        input("Reminder", at(2, 9, 0), at(2, 9, 0)),
        EventSource::Manual,
    )
    .await
    .unwrap();
    assert_eq!(event.start_ts, event.end_ts);
}

#[tokio::test]
async fn standup_scenario_lists_exactly_the_created_event() {
    let pool = test_pool().await;

    let created = events::create_event(
        &pool,
        "alice",
        input("Standup", at(1, 9, 0), at(1, 9, 15)),
        EventSource::Manual,
    )
    .await
    .unwrap();

    let listed = events::list_events(
        &pool,
        &user("alice"),
        Some("alice"),
        at(1, 0, 0),
        at(2, 0, 0),
    )
    .await
    .unwrap();

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, created.id);
    assert_eq!(listed[0].title, "Standup");
    assert_eq!(listed[0].source, EventSource::Manual);
}

#[tokio::test]
async fn listing_intersects_the_window_and_orders_by_start() {
    let pool = test_pool().await;
    let alice = user("alice");

    // Spans into the window from before it.
    events::create_event(
        &pool,
        "alice",
        input(
            "Overnight",
            Utc.with_ymd_and_hms(2023, 12, 31, 23, 0, 0).unwrap(),
            at(1, 1, 0),
        ),
        EventSource::Manual,
    )
    .await
    .unwrap();
    events::create_event(&pool, "alice", input("Second", at(2, 9, 0), at(2, 10, 0)), EventSource::Manual)
        .await
        .unwrap();
    events::create_event(&pool, "alice", input("First", at(1, 9, 0), at(1, 10, 0)), EventSource::Manual)
        .await
        .unwrap();
    // Entirely past the window.
    events::create_event(&pool, "alice", input("Later", at(5, 9, 0), at(5, 10, 0)), EventSource::Manual)
        .await
        .unwrap();

    let listed = events::list_events(&pool, &alice, None, at(1, 0, 0), at(3, 0, 0))
        .await
        .unwrap();

    let titles: Vec<&str> = listed.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["Overnight", "First", "Second"]);
}

#[tokio::test]
async fn update_replaces_fields_but_not_identity() {
    let pool = test_pool().await;
    let alice = user("alice");

    let created = events::create_event(
        &pool,
        "alice",
        input("Standup", at(1, 9, 0), at(1, 9, 15)),
        EventSource::Manual,
    )
    .await
    .unwrap();

    let mut replacement = input("Retro", at(1, 16, 0), at(1, 17, 0));
    replacement.location = Some("Room 4".to_string());

    let updated = events::update_event(&pool, &alice, &created.id, replacement)
        .await
        .unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.owner, "alice");
    assert_eq!(updated.source, EventSource::Manual);
    assert_eq!(updated.title, "Retro");
    assert_eq!(updated.location.as_deref(), Some("Room 4"));

    let listed = events::list_events(&pool, &alice, None, at(1, 0, 0), at(2, 0, 0))
        .await
        .unwrap();
    assert_eq!(listed[0].title, "Retro");
}

#[tokio::test]
async fn foreign_events_are_invisible_to_other_owners() {
    let pool = test_pool().await;
    let alice = user("alice");
    let bob = user("bob");

    let created = events::create_event(
        &pool,
        "alice",
        input("Private", at(1, 9, 0), at(1, 10, 0)),
        EventSource::Manual,
    )
    .await
    .unwrap();

    let err = events::update_event(&pool, &bob, &created.id, input("Hijack", at(1, 9, 0), at(1, 10, 0)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Data(DataError::EventNotFound)));

    let err = events::delete_event(&pool, &bob, &created.id).await.unwrap_err();
    assert!(matches!(err, AppError::Data(DataError::EventNotFound)));

    let err = events::list_events(&pool, &bob, Some("alice"), at(1, 0, 0), at(2, 0, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized));
}

#[tokio::test]
async fn admins_may_manage_anyones_events() {
    let pool = test_pool().await;
    let root = admin("root");

    let created = events::create_event(
        &pool,
        "alice",
        input("Private", at(1, 9, 0), at(1, 10, 0)),
        EventSource::Manual,
    )
    .await
    .unwrap();
    events::create_event(&pool, "bob", input("Other", at(2, 9, 0), at(2, 10, 0)), EventSource::Manual)
        .await
        .unwrap();

    // Unscoped admin listing sees every owner.
    let all = events::list_events(&pool, &root, None, at(1, 0, 0), at(3, 0, 0))
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    events::delete_event(&pool, &root, &created.id).await.unwrap();
    let remaining = events::list_events(&pool, &root, None, at(1, 0, 0), at(3, 0, 0))
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
}

#[tokio::test]
async fn missing_event_id_answers_not_found() {
    let pool = test_pool().await;

    let err = events::delete_event(&pool, &user("alice"), &Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Data(DataError::EventNotFound)));
}

/// Pulls (SUMMARY, DTSTART, DTEND) out of each VEVENT block.
fn parse_vevents(ics: &str) -> Vec<(String, String, String)> {
    let mut out = Vec::new();
    let mut current: Option<(String, String, String)> = None;

    for line in ics.lines() {
        let line = line.trim_end();
        if line == "BEGIN:VEVENT" {
            current = Some((String::new(), String::new(), String::new()));
        } else if line == "END:VEVENT" {
            if let Some(t) = current.take() {
                out.push(t);
            }
        } else if let Some(ref mut t) = current {
            if let Some(v) = line.strip_prefix("SUMMARY:") {
                t.0 = v.to_string();
            } else if let Some(v) = line.strip_prefix("DTSTART:") {
                t.1 = v.to_string();
            } else if let Some(v) = line.strip_prefix("DTEND:") {
                t.2 = v.to_string();
            }
        }
    }

    out
}

#[tokio::test]
async fn exported_ics_matches_the_filtered_listing() {
    let pool = test_pool().await;
    let alice = user("alice");

    events::create_event(&pool, "alice", input("Standup", at(1, 9, 0), at(1, 9, 15)), EventSource::Manual)
        .await
        .unwrap();
    events::create_event(&pool, "alice", input("Review", at(2, 14, 0), at(2, 15, 30)), EventSource::Manual)
        .await
        .unwrap();
    // Outside the exported window.
    events::create_event(&pool, "alice", input("Later", at(9, 9, 0), at(9, 10, 0)), EventSource::Manual)
        .await
        .unwrap();

    let window = (at(1, 0, 0), at(3, 0, 0));
    let listed = events::list_events(&pool, &alice, None, window.0, window.1)
        .await
        .unwrap();
    let ics = events::export_ics(&pool, &alice, None, window.0, window.1)
        .await
        .unwrap();

    let mut exported = parse_vevents(&ics);
    exported.sort();

    let mut expected: Vec<(String, String, String)> = listed
        .iter()
        .map(|e| {
            (
                e.title.clone(),
                e.start_ts.format("%Y%m%dT%H%M%SZ").to_string(),
                e.end_ts.format("%Y%m%dT%H%M%SZ").to_string(),
            )
        })
        .collect();
    expected.sort();

    assert_eq!(exported.len(), 2);
    assert_eq!(exported, expected);

    // UID carries the event identifier.
    for event in &listed {
        assert!(ics.contains(&format!("UID:{}", event.id)));
    }
}
