/// Error handling for the API server
///
/// Handlers return `ApiResult<T>`. Domain failures keep their stable code
/// (`invalid_credentials`, `project_not_found`, ...) and are mapped to a
/// fixed status here; request-shape failures become `bad_request` or
/// `validation_error`. Every error renders as
///
/// ```json
/// { "error": "access_denied", "message": "Access denied" }
/// ```
///
/// with an extra `details` array for validation failures. Internal errors
/// are logged and replaced by a generic message.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use taskboard_shared::error::DomainError;
use validator::ValidationErrors;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Business rule violation raised by the shared crate
    Domain(DomainError),

    /// Malformed request body or query (400)
    BadRequest(String),

    /// Field validation failed (422)
    ValidationError(Vec<ValidationErrorDetail>),

    /// A dependency is down (503)
    ServiceUnavailable(String),

    /// Internal server error (500)
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable code
    pub error: String,

    /// Human-readable message
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

/// HTTP status of a domain error code
pub fn status_for(err: &DomainError) -> StatusCode {
    match err {
        DomainError::InvalidCredentials
        | DomainError::Unauthorized
        | DomainError::TokenExpired
        | DomainError::TokenValidationFailed => StatusCode::UNAUTHORIZED,
        DomainError::PasswordTooWeak | DomainError::BadRequest(_) => StatusCode::BAD_REQUEST,
        DomainError::AccessDenied => StatusCode::FORBIDDEN,
        DomainError::ProjectNotFound
        | DomainError::SectionIsNotFound
        | DomainError::TaskNotFound
        | DomainError::UserNotFound => StatusCode::NOT_FOUND,
        DomainError::AuthDataIsNotUnique
        | DomainError::ProjectNameIsNotUnique
        | DomainError::TimerAlreadyRunning
        | DomainError::TimerNotRunning => StatusCode::CONFLICT,
        DomainError::Store(_) | DomainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    /// Status code and machine-readable code of this error
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Domain(err) => (status_for(err), err.code()),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::ValidationError(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            ApiError::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable"),
            ApiError::InternalError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Domain(err) => write!(f, "{}", err),
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let (message, details) = match self {
            ApiError::Domain(err) if err.is_internal() => {
                tracing::error!(error = %err, "Internal error");
                ("An internal error occurred".to_string(), None)
            }
            ApiError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                ("An internal error occurred".to_string(), None)
            }
            ApiError::Domain(err) => (err.to_string(), None),
            ApiError::BadRequest(msg) | ApiError::ServiceUnavailable(msg) => (msg, None),
            ApiError::ValidationError(errors) => ("Request validation failed".to_string(), Some(errors)),
        };

        let body = Json(ErrorResponse {
            error: code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut details: Vec<ValidationErrorDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::ValidationError(details)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
