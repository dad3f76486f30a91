use chrono::{Duration, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use zeroize::Zeroizing;
use crate::error::{AppError, DataError, Result};
use crate::models::user::{Permission, PermissionSet, User, ALL_PERMISSIONS};
use crate::repositories::{event as event_repo, user as user_repo};
use crate::services::auth;

/// The username the first-run seed creates.
const SEED_ADMIN_USERNAME: &str = "admin";

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|e| e.is_unique_violation())
}

/// Creates a new user with a hashed password.
///
/// Fails with `DataError::DuplicateUser` when the username is taken.
///
/// # Arguments
///
/// * `db` - The database connection pool.
/// * `username` - The new user's username.
/// * `password` - The new user's password, hashed before storage.
/// * `permissions` - The new user's page permissions.
///
/// # Returns
///
/// A `Result` containing the created `User`.
pub async fn create_user(
    db: &SqlitePool,
    username: &str,
    password: &str,
    permissions: PermissionSet,
) -> Result<User> {
    tracing::debug!("🔐 Creating user: {}", username);

    let password_hash = auth::hash_password(password)?;
    let created_at = Utc::now();

    match user_repo::insert_user(db, username, &password_hash, &permissions, created_at).await {
        Ok(()) => {}
        Err(AppError::Database(e)) if is_unique_violation(&e) => {
            return Err(DataError::DuplicateUser.into());
        }
        Err(e) => return Err(e),
    }

    tracing::info!("✅ User created: {}", username);

    Ok(User {
        username: username.to_string(),
        password_hash,
        permissions,
        created_at,
        last_login: None,
    })
}

/// Fetches a single user.
pub async fn get_user(db: &SqlitePool, username: &str) -> Result<User> {
    user_repo::find_by_username(db, username)
        .await?
        .ok_or_else(|| DataError::UserNotFound.into())
}

/// Lists every user, ordered by username.
pub async fn list_users(db: &SqlitePool) -> Result<Vec<User>> {
    user_repo::list_users(db).await
}

/// Atomically replaces a user's permission set.
///
/// Refuses with `DataError::LastAdminProtected` when the replacement
/// would strip the admin tag from the sole remaining admin: the check
/// and the write share one transaction, so no interleaving of admin
/// edits can leave the system without an admin.
pub async fn update_permissions(
    db: &SqlitePool,
    username: &str,
    permissions: PermissionSet,
) -> Result<()> {
    let mut tx = db.begin().await?;

    let user = user_repo::find_by_username(&mut *tx, username)
        .await?
        .ok_or(DataError::UserNotFound)?;

    if user.permissions.is_admin()
        && !permissions.is_admin()
        && user_repo::count_admins(&mut *tx).await? <= 1
    {
        return Err(DataError::LastAdminProtected.into());
    }

    user_repo::update_permissions(&mut *tx, username, &permissions).await?;
    tx.commit().await?;

    tracing::info!("✅ Permissions updated for {}: {}", username, permissions.to_tags());
    Ok(())
}

/// Deletes a user.
///
/// Fails with `DataError::UserNotFound` when absent, and with
/// `DataError::LastAdminProtected` when the target is the only user
/// holding the admin tag (checked in the deleting transaction).
pub async fn delete_user(db: &SqlitePool, username: &str) -> Result<()> {
    let mut tx = db.begin().await?;

    let user = user_repo::find_by_username(&mut *tx, username)
        .await?
        .ok_or(DataError::UserNotFound)?;

    if user.permissions.is_admin() && user_repo::count_admins(&mut *tx).await? <= 1 {
        return Err(DataError::LastAdminProtected.into());
    }

    user_repo::delete_user(&mut *tx, username).await?;
    tx.commit().await?;

    tracing::info!("✅ User deleted: {}", username);
    Ok(())
}

/// Seeds the admin user on first run.
///
/// A no-op when an admin-tagged user already exists. Otherwise creates
/// the `admin` user from the configured seed password, or logs what is
/// missing, matching the original first-run behavior.
pub async fn ensure_admin_user(
    db: &SqlitePool,
    admin_password: Option<&Zeroizing<String>>,
) -> Result<()> {
    if user_repo::count_admins(db).await? > 0 {
        return Ok(());
    }

    if user_repo::find_by_username(db, SEED_ADMIN_USERNAME).await?.is_some() {
        tracing::warn!(
            "⚠️  User '{}' exists but holds no admin permission; leaving it untouched",
            SEED_ADMIN_USERNAME
        );
        return Ok(());
    }

    match admin_password {
        Some(password) => {
            create_user(
                db,
                SEED_ADMIN_USERNAME,
                password.as_str(),
                PermissionSet::new(ALL_PERMISSIONS),
            )
            .await?;
            tracing::info!("✅ Admin user created from ATRIUM_ADMIN_PASSWORD");
        }
        None => {
            tracing::warn!("⚠️  No admin user found and ATRIUM_ADMIN_PASSWORD is not set");
            tracing::warn!("   Set ATRIUM_ADMIN_PASSWORD to create the admin user automatically");
        }
    }

    Ok(())
}

/// Counters shown on the admin panel.
#[derive(Debug, Serialize)]
pub struct PortalStats {
    pub total_users: usize,
    pub calendar_users: usize,
    pub image_generator_users: usize,
    pub admin_users: usize,
    pub total_events: i64,
    pub recent_events: i64,
}

/// Collects user and event counters for the admin panel.
///
/// `recent_events` counts events created in the last seven days, as the
/// original statistics tab did.
pub async fn stats(db: &SqlitePool) -> Result<PortalStats> {
    let users = user_repo::list_users(db).await?;
    let total_events = event_repo::count_all(db).await?;
    let recent_events =
        event_repo::count_created_since(db, Utc::now() - Duration::days(7)).await?;

    Ok(PortalStats {
        total_users: users.len(),
        calendar_users: users
            .iter()
            .filter(|u| u.permissions.has(Permission::Calendar))
            .count(),
        image_generator_users: users
            .iter()
            .filter(|u| u.permissions.has(Permission::ImageGenerator))
            .count(),
        admin_users: users
            .iter()
            .filter(|u| u.permissions.has(Permission::Admin))
            .count(),
        total_events,
        recent_events,
    })
}
