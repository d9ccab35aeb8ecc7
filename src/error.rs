use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::auth::{AuthError, TokenError};
use crate::photos::PhotoError;
use crate::store::{ConflictField, StoreError};
use crate::validation::ValidationError;

#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    BadRequest(String),
    Conflict(ConflictField),
    NotFound,
    Unauthorized(String),
    Token(TokenError),
    Upload(PhotoError),
    Database(sqlx::Error),
    Internal(String),
}

fn error_body(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(e) => error_body(StatusCode::BAD_REQUEST, &e.to_string()),
            AppError::BadRequest(message) => error_body(StatusCode::BAD_REQUEST, &message),
            AppError::Conflict(ConflictField::Email) => {
                error_body(StatusCode::BAD_REQUEST, "Email already exists")
            }
            AppError::Conflict(ConflictField::Phone) => {
                error_body(StatusCode::BAD_REQUEST, "Phone number already exists")
            }
            AppError::NotFound => error_body(StatusCode::NOT_FOUND, "Member not found"),
            AppError::Unauthorized(message) => error_body(StatusCode::UNAUTHORIZED, &message),
            AppError::Token(e) => e.into_response(),
            AppError::Upload(PhotoError::Rejected(message)) => {
                error_body(StatusCode::BAD_REQUEST, message)
            }
            AppError::Upload(e) => {
                tracing::error!("Photo upload error: {e}");
                error_body(StatusCode::BAD_REQUEST, "Failed to upload image")
            }
            AppError::Database(sqlx::Error::PoolTimedOut) => {
                tracing::warn!("Database pool exhausted");
                error_body(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Service temporarily unavailable, please retry",
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                error_body(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e}");
                error_body(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Database(e)
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => AppError::NotFound,
            StoreError::Conflict(field) => AppError::Conflict(field),
            StoreError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::Validation(e)
    }
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        AppError::Token(e)
    }
}

impl From<PhotoError> for AppError {
    fn from(e: PhotoError) -> Self {
        AppError::Upload(e)
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => {
                AppError::Unauthorized("Invalid credentials".to_string())
            }
            AuthError::Database(e) => AppError::Database(e),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return AppError::BadRequest("File too large".to_string());
        }
        AppError::BadRequest(format!("Invalid form data: {}", e.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(e: QueryRejection) -> Self {
        AppError::BadRequest(e.body_text())
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::BadRequest(e.body_text())
    }
}
