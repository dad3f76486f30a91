use crate::error::{AppError, Result};
use crate::models::user::PermissionSet;

/// Validates a username.
///
/// # Arguments
///
/// * `username` - The username to validate.
///
/// # Returns
///
/// A `Result<()>` indicating whether the username is valid.
pub fn validate_username(username: &str) -> Result<()> {
    if username.is_empty() || username.len() < 3 {
        return Err(AppError::Validation(
            "Username must be at least 3 characters long".to_string(),
        ));
    }

    if username.len() > 64 {
        return Err(AppError::Validation(
            "Username must be at most 64 characters".to_string(),
        ));
    }

    if !username.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err(AppError::Validation(
            "Username can only contain letters, numbers, underscores, and hyphens".to_string(),
        ));
    }

    Ok(())
}

/// Validates a password.
///
/// # Arguments
///
/// * `password` - The password to validate.
///
/// # Returns
///
/// A `Result<()>` indicating whether the password is valid.
pub fn validate_password(password: &str) -> Result<()> {
    if password.len() < 8 {
        return Err(AppError::Validation(
            "Password must be at least 8 characters long".to_string(),
        ));
    }

    if password.len() > 128 {
        return Err(AppError::Validation(
            "Password must be at most 128 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validates the permission set assigned to a new or edited user.
///
/// A user with no permissions could log in but open no page, which the
/// admin panel never allows to be created in the first place.
pub fn validate_permissions(permissions: &PermissionSet) -> Result<()> {
    if permissions.is_empty() {
        return Err(AppError::Validation(
            "At least one permission must be selected".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::{Permission, PermissionSet};

    #[test]
    fn usernames_are_bounded_and_charset_checked() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("al").is_err());
        assert!(validate_username("").is_err());
        assert!(validate_username("a".repeat(65).as_str()).is_err());
        assert!(validate_username("alice bob").is_err());
        assert!(validate_username("alice_bob-1").is_ok());
    }

    #[test]
    fn passwords_are_bounded() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("longenough").is_ok());
        assert!(validate_password(&"x".repeat(129)).is_err());
    }

    #[test]
    fn empty_permission_set_is_rejected() {
        assert!(validate_permissions(&PermissionSet::default()).is_err());
        assert!(validate_permissions(&PermissionSet::new([Permission::Calendar])).is_ok());
    }
}
