// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Global Application Error Enum.
/// Every service operation fails with one of these; the HTTP layer maps them
/// to a status code and a `{"error": ...}` body.
#[derive(Debug, PartialEq)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request: malformed or missing input fields
    Validation(String),

    // 401 Unauthorized
    AuthError(String),

    // 403 Forbidden: role or ownership check failed
    AccessDenied(String),

    // 404 Not Found (survey, template or user)
    NotFound(String),

    // 409 Conflict (e.g., email already registered)
    Conflict(String),

    // 400: submission after the survey's expiry
    Expired,

    // 400: one-response-per-address violation
    DuplicateSubmission,

    // 400: carries the text of the unanswered required question
    MissingRequiredAnswer(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Expired => write!(f, "Survey has expired"),
            AppError::DuplicateSubmission => {
                write!(f, "Already submitted response from this IP")
            }
            AppError::MissingRequiredAnswer(text) => write!(f, "Question \"{}\" is required", text),
            other => write!(f, "{:?}", other),
        }
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::AccessDenied(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            err @ (AppError::Expired
            | AppError::DuplicateSubmission
            | AppError::MissingRequiredAnswer(_)) => (StatusCode::BAD_REQUEST, err.to_string()),
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::InternalServerError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_errors_map_to_bad_request() {
        for err in [
            AppError::Expired,
            AppError::DuplicateSubmission,
            AppError::MissingRequiredAnswer("Age".to_string()),
        ] {
            assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn missing_answer_message_names_the_question() {
        let err = AppError::MissingRequiredAnswer("Favourite colour".to_string());
        assert_eq!(err.to_string(), "Question \"Favourite colour\" is required");
    }

    #[test]
    fn access_denied_is_forbidden() {
        let resp = AppError::AccessDenied("nope".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
