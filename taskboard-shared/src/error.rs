/// Domain error taxonomy
///
/// Every rule violation detected in the auth subsystem or the services is
/// raised as a [`DomainError`] at the point of detection. Each variant has a
/// stable machine-readable code; the HTTP layer maps codes to status codes
/// and never needs to inspect messages.

use thiserror::Error;

use crate::repository::StoreError;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid login or password")]
    InvalidCredentials,

    #[error("Authentication required")]
    Unauthorized,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token validation failed")]
    TokenValidationFailed,

    #[error("Password is too weak")]
    PasswordTooWeak,

    #[error("Email or username is already taken")]
    AuthDataIsNotUnique,

    #[error("Project name is already taken")]
    ProjectNameIsNotUnique,

    #[error("Project not found")]
    ProjectNotFound,

    #[error("Section not found")]
    SectionIsNotFound,

    #[error("Task not found")]
    TaskNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Access denied")]
    AccessDenied,

    #[error("Timer is already running")]
    TimerAlreadyRunning,

    #[error("Timer is not running")]
    TimerNotRunning,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::InvalidCredentials => "invalid_credentials",
            DomainError::Unauthorized => "unauthorized",
            DomainError::TokenExpired => "token_expired",
            DomainError::TokenValidationFailed => "token_validation_failed",
            DomainError::PasswordTooWeak => "password_too_weak",
            DomainError::AuthDataIsNotUnique => "auth_data_is_not_unique",
            DomainError::ProjectNameIsNotUnique => "project_name_is_not_unique",
            DomainError::ProjectNotFound => "project_not_found",
            DomainError::SectionIsNotFound => "section_is_not_found",
            DomainError::TaskNotFound => "task_not_found",
            DomainError::UserNotFound => "user_not_found",
            DomainError::AccessDenied => "access_denied",
            DomainError::TimerAlreadyRunning => "timer_already_running",
            DomainError::TimerNotRunning => "timer_not_running",
            DomainError::BadRequest(_) => "bad_request",
            DomainError::Store(_) | DomainError::Internal(_) => "internal_error",
        }
    }

    /// Whether the error is a server fault rather than a rule violation
    pub fn is_internal(&self) -> bool {
        matches!(self, DomainError::Store(_) | DomainError::Internal(_))
    }
}

impl From<crate::auth::password::PasswordError> for DomainError {
    fn from(err: crate::auth::password::PasswordError) -> Self {
        match err {
            crate::auth::password::PasswordError::TooWeak => DomainError::PasswordTooWeak,
            other => DomainError::Internal(other.to_string()),
        }
    }
}
