use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::time::Duration;
use crate::error::Result;

/// The embedded schema migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!();

/// Creates the SQLite connection pool and applies pending migrations.
///
/// # Arguments
///
/// * `database_path` - The path of the SQLite database file. Created if
///   it does not exist.
///
/// # Returns
///
/// A `Result` containing the `SqlitePool`.
pub async fn create_pool(database_path: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(database_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(options)
        .await?;

    MIGRATOR.run(&pool).await?;

    Ok(pool)
}
