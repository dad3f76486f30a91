use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A page capability a user can hold.
///
/// The set of tags is fixed: permissions in the database outside this
/// enumeration are treated as corrupt data, not silently ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Access to the calendar page and the event store.
    Calendar,
    /// Access to the image generator page.
    ImageGenerator,
    /// Access to the admin panel. Implies every other page.
    Admin,
}

/// Every permission, in tag order.
pub const ALL_PERMISSIONS: [Permission; 3] = [
    Permission::Calendar,
    Permission::ImageGenerator,
    Permission::Admin,
];

impl Permission {
    /// Returns the tag stored in the `permissions` column for this variant.
    pub fn as_tag(&self) -> &'static str {
        match self {
            Permission::Calendar => "calendar",
            Permission::ImageGenerator => "image_generator",
            Permission::Admin => "admin",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// The error returned when a permission tag is not in the fixed set.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown permission tag: {0}")]
pub struct UnknownPermission(pub String);

impl FromStr for Permission {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "calendar" => Ok(Permission::Calendar),
            "image_generator" => Ok(Permission::ImageGenerator),
            "admin" => Ok(Permission::Admin),
            other => Err(UnknownPermission(other.to_string())),
        }
    }
}

/// A user's resolved set of page capabilities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    /// Creates a set from the given permissions.
    pub fn new(permissions: impl IntoIterator<Item = Permission>) -> Self {
        Self(permissions.into_iter().collect())
    }

    /// Whether this set allows navigating to the given page.
    ///
    /// Admin implicitly allows every page.
    pub fn allows(&self, page: Permission) -> bool {
        self.0.contains(&Permission::Admin) || self.0.contains(&page)
    }

    /// Whether the set carries the admin tag.
    pub fn is_admin(&self) -> bool {
        self.0.contains(&Permission::Admin)
    }

    /// Whether the tag itself is present, without admin implication.
    pub fn has(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The pages this set may open, for navigation rendering.
    pub fn accessible_pages(&self) -> Vec<Permission> {
        ALL_PERMISSIONS
            .into_iter()
            .filter(|page| self.allows(*page))
            .collect()
    }

    /// Parses the comma-joined tag string stored in the `permissions` column.
    pub fn from_tags(tags: &str) -> Result<Self, UnknownPermission> {
        tags.split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(Permission::from_str)
            .collect::<Result<BTreeSet<_>, _>>()
            .map(Self)
    }

    /// Serializes the set as the comma-joined tag string for storage.
    pub fn to_tags(&self) -> String {
        self.0
            .iter()
            .map(Permission::as_tag)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Represents a user in the system.
#[derive(Clone, Debug)]
pub struct User {
    /// The user's unique username.
    pub username: String,
    /// The user's hashed password (Argon2id PHC string).
    pub password_hash: String,
    /// The user's page permissions.
    pub permissions: PermissionSet,
    /// The timestamp when the user was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp of the user's last successful login.
    pub last_login: Option<DateTime<Utc>>,
}
