use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Coarse failure classes surfaced to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Unauthorized,
    Storage,
    RandomnessUnavailable,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid date format. Use YYYY-MM-DD")]
    InvalidDateFormat,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Username already taken")]
    UsernameTaken,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("storage failure: {0}")]
    Storage(#[source] anyhow::Error),

    #[error("entropy source unavailable: {0}")]
    RandomnessUnavailable(#[source] rand::Error),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) | AppError::InvalidDateFormat => ErrorKind::Validation,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::DuplicateEmail | AppError::UsernameTaken => ErrorKind::Conflict,
            AppError::InvalidCredentials => ErrorKind::Unauthorized,
            AppError::Storage(_) => ErrorKind::Storage,
            AppError::RandomnessUnavailable(_) => ErrorKind::RandomnessUnavailable,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Storage | ErrorKind::RandomnessUnavailable => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Storage(e.into())
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Storage(e.into())
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        warn!(error = %e, "rejected json body");
        AppError::validation("Cannot parse JSON")
    }
}

impl From<MultipartRejection> for AppError {
    fn from(e: MultipartRejection) -> Self {
        warn!(error = %e, "rejected multipart body");
        AppError::validation("Cannot parse form data")
    }
}

impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        warn!(error = %e, "broken multipart field");
        AppError::validation("Cannot parse form data")
    }
}

/// True when the database rejected a write because of a UNIQUE constraint.
pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        // internal detail stays in the logs
        let message = match self.kind() {
            ErrorKind::Storage => {
                error!(error = ?self, "storage failure");
                "Internal server error".to_string()
            }
            ErrorKind::RandomnessUnavailable => {
                error!(error = ?self, "randomness unavailable");
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
