//! Error Handling Utilities
//!
//! Application-wide error type and the JSON error body returned by the API.
//! Messages on user-facing variants are shown to the end user verbatim, so
//! they are written as sentences the app can put straight into an alert.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;
use crate::utils::validation::{messages, PasswordChecklist};

/// Main application error type that can represent errors from any feature
#[derive(Error, Debug)]
pub enum AppError {
    /// Storage backend errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Validation errors for user input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Password and confirmation fail the checklist
    #[error("Password requirements not met: {}", .0.unmet().join(", "))]
    WeakPassword(PasswordChecklist),

    /// Malformed or unacceptable requests
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Authentication and authorization errors
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Account exists but may not sign in yet
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found errors
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Conflict errors (e.g., duplicate resources)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Too many attempts against a single resource
    #[error("Too many requests: {0}")]
    TooManyRequests(String),

    /// External service errors (mail relay)
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Generic internal server errors
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Password hashing errors
    #[error("Password hashing error: {0}")]
    HashingError(#[from] bcrypt::BcryptError),
}

/// Standard error response structure for API endpoints
#[derive(Serialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
            details: None,
        }
    }

    pub fn with_details(error: &str, message: &str, details: serde_json::Value) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
            details: Some(details),
        }
    }
}

impl AppError {
    /// HTTP status, machine-readable code and user-facing message for this error
    pub fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Store(StoreError::NotFound(what)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", format!("{} not found", what))
            }
            AppError::Store(StoreError::Conflict(msg)) => {
                (StatusCode::CONFLICT, "CONFLICT", msg.clone())
            }
            AppError::Store(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "A database error occurred".to_string(),
            ),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::WeakPassword(_) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                messages::PASSWORD_REQUIREMENTS.to_string(),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, "AUTHENTICATION_ERROR", msg.clone())
            }
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::TooManyRequests(msg) => {
                (StatusCode::TOO_MANY_REQUESTS, "TOO_MANY_REQUESTS", msg.clone())
            }
            AppError::ExternalService(_) => (
                StatusCode::BAD_GATEWAY,
                "EXTERNAL_SERVICE_ERROR",
                "Message failed to send. Please try again.".to_string(),
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal server error occurred".to_string(),
            ),
            AppError::Configuration(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIGURATION_ERROR",
                "Server configuration error".to_string(),
            ),
            AppError::HashingError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "HASHING_ERROR",
                "Password hashing error".to_string(),
            ),
        }
    }

    /// Structured details attached to the error body, if any
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::WeakPassword(checklist) => Some(serde_json::json!({
                "checklist": checklist,
                "unmet": checklist.unmet(),
            })),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = self.parts();

        if status.is_server_error() {
            log::error!("{}", self);
        }

        let error_response = match self.details() {
            Some(details) => ErrorResponse::with_details(error_code, &message, details),
            None => ErrorResponse::new(error_code, &message),
        };
        (status, Json(error_response)).into_response()
    }
}

/// Result type alias for operations that can return AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_response_body_carries_code_and_details() {
        let response = AppError::WeakPassword(PasswordChecklist::evaluate("Passw0rd!", "other"))
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "VALIDATION_ERROR");
        assert_eq!(body["details"]["unmet"][0], PasswordChecklist::MATCH_LABEL);
    }

    #[tokio::test]
    async fn test_plain_errors_omit_details() {
        let response = AppError::Conflict("taken".to_string()).into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "taken");
        assert!(body.get("details").is_none());
    }

    #[test]
    fn test_mail_failure_message_is_generic() {
        let (status, code, message) =
            AppError::ExternalService("smtp timeout".to_string()).parts();
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(code, "EXTERNAL_SERVICE_ERROR");
        assert_eq!(message, "Message failed to send. Please try again.");
    }

    #[test]
    fn test_user_facing_messages_pass_through() {
        let (status, code, message) =
            AppError::BadRequest("Incorrect or expired code.".to_string()).parts();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "BAD_REQUEST");
        assert_eq!(message, "Incorrect or expired code.");
    }

    #[test]
    fn test_internal_details_are_masked() {
        let (status, _, message) = AppError::Internal("pool exhausted".to_string()).parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!message.contains("pool"));

        let (status, _, message) =
            AppError::Store(StoreError::Backend("connection reset".to_string())).parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!message.contains("connection"));
    }

    #[test]
    fn test_weak_password_carries_checklist() {
        let checklist = PasswordChecklist::evaluate("short", "short");
        let error = AppError::WeakPassword(checklist);

        let (status, _, message) = error.parts();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, messages::PASSWORD_REQUIREMENTS);

        let details = error.details().unwrap();
        assert_eq!(details["checklist"]["matches"], true);
        assert_eq!(details["unmet"][0], PasswordChecklist::LENGTH_LABEL);
    }

    #[test]
    fn test_store_not_found_maps_to_404() {
        let (status, code, message) =
            AppError::Store(StoreError::NotFound("User".to_string())).parts();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(code, "NOT_FOUND");
        assert_eq!(message, "User not found");
    }
}
