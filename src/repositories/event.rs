use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteExecutor};
use uuid::Uuid;
use crate::{
    error::{AppError, Result},
    models::event::{CalendarEvent, EventSource},
};

/// A helper function to map a `SqliteRow` to a `CalendarEvent`.
fn row_to_event(row: &SqliteRow) -> Result<CalendarEvent> {
    let id: String = row
        .try_get("id")
        .map_err(|_| AppError::MissingData("id".to_string()))?;
    let source: String = row
        .try_get("source")
        .map_err(|_| AppError::MissingData("source".to_string()))?;

    Ok(CalendarEvent {
        id: Uuid::parse_str(&id)
            .map_err(|_| AppError::MissingData(format!("malformed event id: {}", id)))?,
        owner: row
            .try_get("owner")
            .map_err(|_| AppError::MissingData("owner".to_string()))?,
        title: row
            .try_get("title")
            .map_err(|_| AppError::MissingData("title".to_string()))?,
        start_ts: row
            .try_get("start_ts")
            .map_err(|_| AppError::MissingData("start_ts".to_string()))?,
        end_ts: row
            .try_get("end_ts")
            .map_err(|_| AppError::MissingData("end_ts".to_string()))?,
        description: row
            .try_get("description")
            .map_err(|_| AppError::MissingData("description".to_string()))?,
        location: row
            .try_get("location")
            .map_err(|_| AppError::MissingData("location".to_string()))?,
        source: EventSource::from_tag(&source)
            .ok_or_else(|| AppError::MissingData(format!("unknown event source: {}", source)))?,
        created_at: row
            .try_get("created_at")
            .map_err(|_| AppError::MissingData("created_at".to_string()))?,
        updated_at: row
            .try_get("updated_at")
            .map_err(|_| AppError::MissingData("updated_at".to_string()))?,
    })
}

/// Inserts a new event row.
pub async fn insert_event<'e, E>(executor: E, event: &CalendarEvent) -> Result<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO events (id, owner, title, start_ts, end_ts, description, location, source, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(event.id.to_string())
    .bind(&event.owner)
    .bind(&event.title)
    .bind(event.start_ts)
    .bind(event.end_ts)
    .bind(&event.description)
    .bind(&event.location)
    .bind(event.source.as_tag())
    .bind(event.created_at)
    .bind(event.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Finds an event by its id.
pub async fn find_by_id<'e, E>(executor: E, id: &Uuid) -> Result<Option<CalendarEvent>>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query(
        r#"
        SELECT id, owner, title, start_ts, end_ts, description, location, source, created_at, updated_at
        FROM events
        WHERE id = ?1
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(executor)
    .await?;
    row.map(|r| row_to_event(&r)).transpose()
}

/// Replaces an event's mutable fields. Returns whether a row was updated.
///
/// The id, owner, source and created_at columns never change.
#[allow(clippy::too_many_arguments)]
pub async fn update_event<'e, E>(
    executor: E,
    id: &Uuid,
    title: &str,
    start_ts: DateTime<Utc>,
    end_ts: DateTime<Utc>,
    description: Option<&str>,
    location: Option<&str>,
    updated_at: DateTime<Utc>,
) -> Result<bool>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE events
        SET title = ?1, start_ts = ?2, end_ts = ?3, description = ?4, location = ?5, updated_at = ?6
        WHERE id = ?7
        "#,
    )
    .bind(title)
    .bind(start_ts)
    .bind(end_ts)
    .bind(description)
    .bind(location)
    .bind(updated_at)
    .bind(id.to_string())
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Deletes an event row. Returns whether a row was deleted.
pub async fn delete_event<'e, E>(executor: E, id: &Uuid) -> Result<bool>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        DELETE FROM events
        WHERE id = ?1
        "#,
    )
    .bind(id.to_string())
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Lists the events whose range intersects the given window, ordered by
/// start timestamp ascending. With an owner, only that owner's events.
pub async fn list_in_range<'e, E>(
    executor: E,
    owner: Option<&str>,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<CalendarEvent>>
where
    E: SqliteExecutor<'e>,
{
    let rows = match owner {
        Some(owner) => {
            sqlx::query(
                r#"
                SELECT id, owner, title, start_ts, end_ts, description, location, source, created_at, updated_at
                FROM events
                WHERE owner = ?1 AND start_ts <= ?2 AND end_ts >= ?3
                ORDER BY start_ts ASC
                "#,
            )
            .bind(owner)
            .bind(to)
            .bind(from)
            .fetch_all(executor)
            .await?
        }
        None => {
            sqlx::query(
                r#"
                SELECT id, owner, title, start_ts, end_ts, description, location, source, created_at, updated_at
                FROM events
                WHERE start_ts <= ?1 AND end_ts >= ?2
                ORDER BY start_ts ASC
                "#,
            )
            .bind(to)
            .bind(from)
            .fetch_all(executor)
            .await?
        }
    };
    rows.iter().map(row_to_event).collect()
}

/// Counts every stored event.
pub async fn count_all<'e, E>(executor: E) -> Result<i64>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query("SELECT COUNT(*) AS n FROM events")
        .fetch_one(executor)
        .await?;
    let n: i64 = row
        .try_get("n")
        .map_err(|_| AppError::MissingData("n".to_string()))?;
    Ok(n)
}

/// Counts the events created at or after the given instant.
pub async fn count_created_since<'e, E>(executor: E, since: DateTime<Utc>) -> Result<i64>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query("SELECT COUNT(*) AS n FROM events WHERE created_at >= ?1")
        .bind(since)
        .fetch_one(executor)
        .await?;
    let n: i64 = row
        .try_get("n")
        .map_err(|_| AppError::MissingData("n".to_string()))?;
    Ok(n)
}
