//! Error types for academy-rs.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // === Client Errors ===
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Course not found: {0}")]
    CourseNotFound(String),

    #[error("Enrollment not found for course: {0}")]
    EnrollmentNotFound(String),

    #[error("Lesson not found in course: {0}")]
    InvalidLesson(String),

    #[error("Already enrolled in course: {0}")]
    DuplicateEnrollment(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rate limited")]
    RateLimited,

    // === Server Errors ===
    #[error("Database error: {0}")]
    Database(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            // 4xx Client Errors
            Self::NotFound(_)
            | Self::CourseNotFound(_)
            | Self::EnrollmentNotFound(_)
            | Self::InvalidLesson(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::DuplicateEnrollment(_) | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,

            // 5xx Server Errors
            Self::Database(_)
            | Self::Queue(_)
            | Self::Config(_)
            | Self::ExternalService(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::CourseNotFound(_) => "COURSE_NOT_FOUND",
            Self::EnrollmentNotFound(_) => "ENROLLMENT_NOT_FOUND",
            Self::InvalidLesson(_) => "INVALID_LESSON",
            Self::DuplicateEnrollment(_) => "DUPLICATE_ENROLLMENT",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::RateLimited => "RATE_LIMITED",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Queue(_) => "QUEUE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns whether this error should be logged at error level.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Returns whether the failed operation may succeed if repeated after a delay.
    ///
    /// Rate limiting is the only transient condition. It is reported either as
    /// [`AppError::RateLimited`] or as an [`AppError::ExternalService`] whose message
    /// carries the downstream `429` status. Ids that happen to contain `429` do not count.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited => true,
            Self::ExternalService(message) => message.contains("429"),
            _ => false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        if self.is_server_error() {
            tracing::error!(error = %self, code = code, "Server error occurred");
        } else {
            tracing::debug!(error = %self, code = code, "Client error occurred");
        }

        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

// === From implementations ===

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_errors_map_to_client_statuses() {
        assert_eq!(
            AppError::DuplicateEnrollment("c1".to_string()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::EnrollmentNotFound("c1".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::InvalidLesson("l1".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::CourseNotFound("c1".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert!(!AppError::InvalidLesson("l1".to_string()).is_server_error());
        assert!(AppError::Database("down".to_string()).is_server_error());
    }

    #[test]
    fn test_transient_detection() {
        assert!(AppError::RateLimited.is_transient());
        assert!(AppError::ExternalService("HTTP 429 Too Many Requests".to_string()).is_transient());
        assert!(!AppError::ExternalService("HTTP 500".to_string()).is_transient());
        assert!(!AppError::Database("connection reset".to_string()).is_transient());
    }

    #[test]
    fn test_429_in_ids_is_not_transient() {
        assert!(!AppError::CourseNotFound("01h429xk".to_string()).is_transient());
        assert!(!AppError::Database("duplicate key enrollment_429".to_string()).is_transient());
        assert!(!AppError::InvalidLesson("c1-l429".to_string()).is_transient());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AppError::DuplicateEnrollment("c".to_string()).error_code(),
            "DUPLICATE_ENROLLMENT"
        );
        assert_eq!(AppError::InvalidLesson("l".to_string()).error_code(), "INVALID_LESSON");
    }
}
