/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /api/auth/login` - Login and get tokens
/// - `POST /api/auth/refresh` - Rotate the token pair
/// - `DELETE /api/auth/logout` - End the session
/// - `POST /api/auth/signup` - Register new user
///
/// Login and refresh also set the `access` cookie; logout clears it.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use taskboard_shared::{
    auth::{
        gateway::{self, Credentials, NewAccount},
        jwt,
        middleware::{access_cookie, clear_access_cookie, extract_access_token},
        password::validate_password_strength,
        tokens::IssuedTokens,
    },
    error::DomainError,
};
use uuid::Uuid;
use validator::Validate;

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email or username
    #[validate(length(min = 1, max = 255, message = "Login is required"))]
    pub login: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    /// Use the long refresh lifetime
    #[serde(default)]
    pub remember_me: bool,
}

/// Refresh request; the access token comes from the cookie or bearer header
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh: String,
}

/// Signup request
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 64, message = "Username must be 1-64 characters"))]
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Checked for strength before the other fields
    pub password: String,

    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(length(max = 100, message = "Surname must be at most 100 characters"))]
    pub surname: Option<String>,
}

/// Signup response
#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,

    /// Projects joined through invitations sent before signup
    pub joined_projects: Vec<Uuid>,
}

fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Token pair body plus the access cookie
fn token_response(state: &AppState, tokens: IssuedTokens) -> impl IntoResponse {
    let max_age = (tokens.access_expires_at - Utc::now()).num_seconds();
    let cookie = access_cookie(&tokens.access, max_age, state.secure_cookies());

    ([(header::SET_COOKIE, cookie)], Json(tokens))
}

/// Login with email or username
///
/// # Endpoint
///
/// ```text
/// POST /api/auth/login
/// Content-Type: application/json
///
/// { "login": "alice", "password": "secret", "remember_me": true }
/// ```
///
/// # Response
///
/// ```json
/// { "access": "eyJ...", "refresh": "9f86d0..." }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: `invalid_credentials`
/// - `422 Unprocessable Entity`: empty login or password
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = body?;
    req.validate()?;

    let tokens = gateway::login(
        &*state.store,
        &state.tokens,
        Credentials {
            login: req.login,
            password: req.password,
            remember_me: req.remember_me,
            user_agent: user_agent(&headers),
        },
        Utc::now(),
    )
    .await?;

    Ok(token_response(&state, tokens))
}

/// Rotate the token pair
///
/// The access token may be expired but must be the one issued with the
/// presented refresh token.
///
/// # Errors
///
/// - `401 Unauthorized`: `unauthorized`, `token_expired` or `token_validation_failed`
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = body?;
    req.validate()?;

    let access = extract_access_token(&headers).ok_or(DomainError::Unauthorized)?;

    let tokens = gateway::refresh(&*state.store, &state.tokens, &access, &req.refresh, Utc::now()).await?;

    Ok(token_response(&state, tokens))
}

/// End the current session and clear the access cookie
///
/// An expired access token is accepted; only its signature is checked.
/// A token whose session is already gone is rejected.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<impl IntoResponse> {
    let access = extract_access_token(&headers).ok_or(DomainError::Unauthorized)?;
    let claims = jwt::decode_expired_token(&access, &state.tokens.secret)
        .map_err(|_| ApiError::from(DomainError::Unauthorized))?;

    gateway::logout(&*state.store, claims.sid).await?;

    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, clear_access_cookie(state.secure_cookies()))],
    ))
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /api/auth/signup
/// Content-Type: application/json
///
/// {
///   "username": "alice",
///   "email": "alice@example.com",
///   "password": "secret",
///   "name": "Alice",
///   "surname": "Smith"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: `password_too_weak`
/// - `409 Conflict`: `auth_data_is_not_unique`
/// - `422 Unprocessable Entity`: malformed email, username or name
pub async fn signup(
    State(state): State<AppState>,
    body: Result<Json<SignupRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SignupResponse>)> {
    let Json(req) = body?;

    validate_password_strength(&req.password).map_err(|_| DomainError::PasswordTooWeak)?;
    req.validate()?;

    let outcome = gateway::signup(
        &*state.store,
        NewAccount {
            username: req.username,
            email: req.email,
            password: req.password,
            name: req.name,
            surname: req.surname,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            id: outcome.user.id,
            username: outcome.user.username,
            email: outcome.user.email,
            joined_projects: outcome.joined_projects,
        }),
    ))
}
