use chrono::{DateTime, Utc};
use crate::models::user::PermissionSet;

/// An authenticated principal with its resolved permission set.
///
/// Valid for one session; never persisted.
#[derive(Debug, Clone)]
pub struct Identity {
    /// The authenticated username.
    pub username: String,
    /// The permission set resolved at login time.
    pub permissions: PermissionSet,
}

/// Represents a user session.
///
/// Sessions live only in the in-process store and die with the process.
/// The permission set is a login-time snapshot: permission edits by an
/// admin take effect at the subject's next login.
#[derive(Debug, Clone)]
pub struct Session {
    /// The username this session belongs to.
    pub username: String,
    /// The permission set captured at login.
    pub permissions: PermissionSet,
    /// The CSRF token issued alongside this session.
    pub csrf_token: String,
    /// The timestamp when the session was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the session expires.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// The identity carried by this session.
    pub fn identity(&self) -> Identity {
        Identity {
            username: self.username.clone(),
            permissions: self.permissions.clone(),
        }
    }
}
