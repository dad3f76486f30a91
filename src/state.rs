use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use chrono::Utc;
use sqlx::SqlitePool;
use tokio::sync::RwLock;
use uuid::Uuid;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::session::Session;

/// An in-process store of live sessions.
///
/// Sessions are ephemeral: they die with the process, and an expired
/// session is evicted the next time it is touched. There is no sweeper
/// task.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, Session>>>,
}

impl SessionStore {
    /// Creates a new, empty `SessionStore`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a session under the given id.
    pub async fn insert(&self, session_id: Uuid, session: Session) {
        self.inner.write().await.insert(session_id, session);
    }

    /// Looks up a live session, evicting it if it has expired.
    pub async fn get(&self, session_id: &Uuid) -> Option<Session> {
        {
            let sessions = self.inner.read().await;
            match sessions.get(session_id) {
                Some(session) if Utc::now() <= session.expires_at => {
                    return Some(session.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        self.inner.write().await.remove(session_id);
        None
    }

    /// Removes a session, returning it if it existed.
    pub async fn remove(&self, session_id: &Uuid) -> Option<Session> {
        self.inner.write().await.remove(session_id)
    }
}

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The database connection pool.
    pub db: SqlitePool,
    /// The live session store.
    pub sessions: SessionStore,
    /// The application's configuration.
    pub config: Config,
    /// The HTTP client used for vision calls.
    pub http: reqwest::Client,
}

impl AppState {
    /// Creates a new `AppState`.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AppState`.
    pub async fn new(config: &Config) -> Result<Self> {
        let db = crate::db::create_pool(&config.database_path).await?;
        tracing::info!("✅ SQLite pool initialized: {}", config.database_path);

        let sessions = SessionStore::new();
        tracing::info!("✅ Session store initialized (in-process)");

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.vision_timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("HTTP client init failed: {}", e)))?;
        tracing::info!(
            "✅ HTTP client initialized ({}s vision timeout)",
            config.vision_timeout_secs
        );

        Ok(AppState {
            db,
            sessions,
            config: config.clone(),
            http,
        })
    }
}
