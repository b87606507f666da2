//! API error types with HTTP response mapping.

use accounts::AuthError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ledger::LedgerError;

use crate::response;

/// Message for every rejected or missing bearer token.
pub const UNAUTHORIZED_MESSAGE: &str = "Invalid authorization header";

/// Message returned in place of any internal failure detail.
pub const INTERNAL_MESSAGE: &str = "Internal server error";

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Missing or invalid bearer token.
    Unauthorized,
    /// Stock movement or listing error.
    Ledger(LedgerError),
    /// Login or account error.
    Auth(AuthError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, UNAUTHORIZED_MESSAGE.to_string()),
            ApiError::Ledger(err) => ledger_error_to_response(err),
            ApiError::Auth(err) => auth_error_to_response(err),
        };

        (status, response::error(message)).into_response()
    }
}

/// Logs the detail and hides it from the client.
fn internal(detail: impl std::fmt::Display) -> (StatusCode, String) {
    tracing::error!(error = %detail, "internal server error");
    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string())
}

fn ledger_error_to_response(err: LedgerError) -> (StatusCode, String) {
    match &err {
        e if e.is_validation() => (StatusCode::BAD_REQUEST, err.to_string()),
        LedgerError::StockNotFound(_) | LedgerError::ProductNotFound(_) => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        LedgerError::InsufficientStock { .. } => {
            (StatusCode::CONFLICT, "Insufficient stock".to_string())
        }
        _ => internal(&err),
    }
}

fn auth_error_to_response(err: AuthError) -> (StatusCode, String) {
    match &err {
        AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, err.to_string()),
        AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, UNAUTHORIZED_MESSAGE.to_string()),
        AuthError::EmailTaken(_) | AuthError::UserInUse(_) => {
            (StatusCode::CONFLICT, err.to_string())
        }
        AuthError::UserNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        AuthError::EmptyPatch | AuthError::MissingField(_) => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        _ => internal(&err),
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err)
    }
}
