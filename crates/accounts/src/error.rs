use std::time::Duration;

use common::UserId;
use thiserror::Error;

/// Errors that can occur in credential storage and authentication.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email or wrong password; callers cannot tell which.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// The bearer token was malformed, expired, or not signed by us.
    #[error("Invalid token")]
    InvalidToken,

    /// Another account already uses this email.
    #[error("Email already registered: {0}")]
    EmailTaken(String),

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// The user is referenced by recorded movements and cannot be removed.
    #[error("User {0} has recorded movements")]
    UserInUse(UserId),

    /// A profile update carried no fields.
    #[error("Nothing to update")]
    EmptyPatch,

    /// A required field was blank.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Token encoding failed: {0}")]
    TokenEncoding(#[from] jsonwebtoken::errors::Error),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for account operations.
pub type Result<T> = std::result::Result<T, AuthError>;
