use std::env;
use anyhow::{Context, Result};
use zeroize::Zeroizing;

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The path of the SQLite database file.
    pub database_path: String,
    /// The address the HTTP server binds to.
    pub bind_addr: String,
    /// The duration of a session in hours.
    pub session_duration_hours: i64,
    /// The password used to seed the admin user on first run.
    pub admin_password: Option<Zeroizing<String>>,
    /// The URL of the external vision endpoint.
    pub vision_endpoint: Option<String>,
    /// The credential for the external vision endpoint.
    pub vision_api_key: Option<Zeroizing<String>>,
    /// The vision model deployment name.
    pub vision_deployment: String,
    /// The vision API version sent as a query parameter.
    pub vision_api_version: String,
    /// The timeout for a single vision call, in seconds.
    pub vision_timeout_secs: u64,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_path: env::var("ATRIUM_DATABASE_PATH")
                .unwrap_or_else(|_| "atrium.db".to_string()),
            bind_addr: env::var("ATRIUM_BIND_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:3000".to_string()),
            session_duration_hours: env::var("SESSION_DURATION_HOURS")
                .unwrap_or_else(|_| "12".to_string())
                .parse()
                .context("Invalid SESSION_DURATION_HOURS")?,
            admin_password: env::var("ATRIUM_ADMIN_PASSWORD").ok().map(Zeroizing::new),
            vision_endpoint: env::var("VISION_ENDPOINT").ok(),
            vision_api_key: env::var("VISION_API_KEY").ok().map(Zeroizing::new),
            vision_deployment: env::var("VISION_DEPLOYMENT")
                .unwrap_or_else(|_| "gpt-4o".to_string()),
            vision_api_version: env::var("VISION_API_VERSION")
                .unwrap_or_else(|_| "2024-02-01".to_string()),
            vision_timeout_secs: env::var("VISION_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("Invalid VISION_TIMEOUT_SECS")?,
        })
    }
}
