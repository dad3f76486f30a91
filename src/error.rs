use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Errors produced by the authenticator.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AuthError {
    /// No user row exists for the submitted username.
    #[error("user not found")]
    UserNotFound,

    /// The submitted password does not match the stored digest.
    #[error("invalid credentials")]
    InvalidCredentials,
}

/// Errors produced by the credential and event stores.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DataError {
    /// The username is already taken.
    #[error("username already exists")]
    DuplicateUser,

    /// No user row exists for the given username.
    #[error("user not found")]
    UserNotFound,

    /// The operation would remove the last remaining admin.
    #[error("cannot remove the last remaining admin")]
    LastAdminProtected,

    /// No event exists with the given id for the requesting owner.
    #[error("event not found")]
    EventNotFound,

    /// The event's start timestamp is after its end timestamp.
    #[error("event start must not be after its end")]
    InvalidRange,
}

/// Errors produced by the vision extraction adapter.
///
/// An image with no detectable events is NOT an error: the adapter
/// returns an empty candidate list in that case.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The vision endpoint could not be reached or timed out.
    #[error("vision service unavailable: {0}")]
    ServiceUnavailable(String),

    /// The vision endpoint rejected the configured credentials.
    #[error("vision service rejected the configured credentials")]
    Auth,

    /// The vision endpoint answered with a body the adapter cannot map.
    #[error("vision service returned an unusable response: {0}")]
    InvalidResponse(String),
}

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A migration error.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// An I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An authentication error.
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// A credential or event store error.
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// A vision extraction error.
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// An authorization error.
    #[error("Authorization failed")]
    Unauthorized,

    /// A validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A column was missing or undecodable in a fetched row.
    #[error("Missing data: {0}")]
    MissingData(String),

    /// A multipart error.
    #[error("Multipart error: {0}")]
    Multipart(String),

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }

            AppError::Migration(ref e) => {
                tracing::error!("Migration error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Migration error".to_string())
            }

            AppError::Io(ref e) => {
                tracing::error!("IO error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "File system error".to_string())
            }

            // Both variants answer with the same message so the wire does
            // not reveal whether the username exists.
            AppError::Auth(ref e) => {
                tracing::warn!("Authentication failed: {}", e);
                (
                    StatusCode::UNAUTHORIZED,
                    "Invalid username or password".to_string(),
                )
            }

            AppError::Data(DataError::DuplicateUser) => {
                tracing::debug!("Duplicate username rejected");
                (StatusCode::CONFLICT, "Username already exists".to_string())
            }

            AppError::Data(DataError::UserNotFound) => {
                tracing::debug!("User not found");
                (StatusCode::NOT_FOUND, "User not found".to_string())
            }

            AppError::Data(DataError::LastAdminProtected) => {
                tracing::warn!("Refused to remove the last remaining admin");
                (
                    StatusCode::CONFLICT,
                    "Cannot remove the last remaining admin".to_string(),
                )
            }

            AppError::Data(DataError::EventNotFound) => {
                tracing::debug!("Event not found");
                (StatusCode::NOT_FOUND, "Event not found".to_string())
            }

            AppError::Data(DataError::InvalidRange) => {
                tracing::debug!("Invalid event range rejected");
                (
                    StatusCode::BAD_REQUEST,
                    "Event start must not be after its end".to_string(),
                )
            }

            AppError::Extraction(ExtractionError::Auth) => {
                tracing::error!("Vision service rejected the configured credentials");
                (
                    StatusCode::BAD_GATEWAY,
                    "Vision service rejected the configured credentials".to_string(),
                )
            }

            AppError::Extraction(ExtractionError::ServiceUnavailable(ref msg)) => {
                tracing::error!("Vision service unavailable: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "Vision service unavailable".to_string(),
                )
            }

            AppError::Extraction(ExtractionError::InvalidResponse(ref msg)) => {
                tracing::error!("Vision service returned an unusable response: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "Vision service returned an unusable response".to_string(),
                )
            }

            AppError::Unauthorized => {
                tracing::warn!("Authorization failed");
                (StatusCode::FORBIDDEN, "Access denied".to_string())
            }

            AppError::Validation(ref msg) => {
                tracing::debug!("Validation error: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone())
            }

            AppError::MissingData(ref msg) => {
                tracing::error!("Missing data: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }

            AppError::Multipart(ref msg) => {
                tracing::error!("Multipart error: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone())
            }

            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = sonic_rs::to_string(&sonic_rs::json!({
            "error": message
        }))
        .unwrap_or_else(|_| r#"{"error":"Internal server error"}"#.to_string());

        (status, body).into_response()
    }
}
