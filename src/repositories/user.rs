use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteExecutor};
use crate::{
    error::{AppError, Result},
    models::user::{PermissionSet, User},
};

/// A helper function to map a `SqliteRow` to a `User`.
fn row_to_user(row: &SqliteRow) -> Result<User> {
    let permissions: String = row
        .try_get("permissions")
        .map_err(|_| AppError::MissingData("permissions".to_string()))?;

    Ok(User {
        username: row
            .try_get("username")
            .map_err(|_| AppError::MissingData("username".to_string()))?,
        password_hash: row
            .try_get("password_hash")
            .map_err(|_| AppError::MissingData("password_hash".to_string()))?,
        permissions: PermissionSet::from_tags(&permissions)
            .map_err(|e| AppError::MissingData(e.to_string()))?,
        created_at: row
            .try_get("created_at")
            .map_err(|_| AppError::MissingData("created_at".to_string()))?,
        last_login: row
            .try_get("last_login")
            .map_err(|_| AppError::MissingData("last_login".to_string()))?,
    })
}

/// Inserts a new user row.
pub async fn insert_user<'e, E>(
    executor: E,
    username: &str,
    password_hash: &str,
    permissions: &PermissionSet,
    created_at: DateTime<Utc>,
) -> Result<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO users (username, password_hash, permissions, created_at, last_login)
        VALUES (?1, ?2, ?3, ?4, NULL)
        "#,
    )
    .bind(username)
    .bind(password_hash)
    .bind(permissions.to_tags())
    .bind(created_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Finds a user by their username.
pub async fn find_by_username<'e, E>(executor: E, username: &str) -> Result<Option<User>>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query(
        r#"
        SELECT username, password_hash, permissions, created_at, last_login
        FROM users
        WHERE username = ?1
        "#,
    )
    .bind(username)
    .fetch_optional(executor)
    .await?;
    row.map(|r| row_to_user(&r)).transpose()
}

/// Lists every user, ordered by username.
pub async fn list_users<'e, E>(executor: E) -> Result<Vec<User>>
where
    E: SqliteExecutor<'e>,
{
    let rows = sqlx::query(
        r#"
        SELECT username, password_hash, permissions, created_at, last_login
        FROM users
        ORDER BY username
        "#,
    )
    .fetch_all(executor)
    .await?;
    rows.iter().map(row_to_user).collect()
}

/// Replaces a user's permission set. Returns whether a row was updated.
pub async fn update_permissions<'e, E>(
    executor: E,
    username: &str,
    permissions: &PermissionSet,
) -> Result<bool>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE users
        SET permissions = ?1
        WHERE username = ?2
        "#,
    )
    .bind(permissions.to_tags())
    .bind(username)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Records a successful login.
pub async fn update_last_login<'e, E>(
    executor: E,
    username: &str,
    at: DateTime<Utc>,
) -> Result<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        UPDATE users
        SET last_login = ?1
        WHERE username = ?2
        "#,
    )
    .bind(at)
    .bind(username)
    .execute(executor)
    .await?;
    Ok(())
}

/// Deletes a user row. Returns whether a row was deleted.
pub async fn delete_user<'e, E>(executor: E, username: &str) -> Result<bool>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        DELETE FROM users
        WHERE username = ?1
        "#,
    )
    .bind(username)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Counts the users holding the admin tag.
///
/// The permissions column is a comma-joined tag list; wrapping it in
/// commas makes the LIKE match exact-tag rather than substring.
pub async fn count_admins<'e, E>(executor: E) -> Result<i64>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query(
        r#"
        SELECT COUNT(*) AS n
        FROM users
        WHERE (',' || permissions || ',') LIKE '%,admin,%'
        "#,
    )
    .fetch_one(executor)
    .await?;
    let n: i64 = row
        .try_get("n")
        .map_err(|_| AppError::MissingData("n".to_string()))?;
    Ok(n)
}
