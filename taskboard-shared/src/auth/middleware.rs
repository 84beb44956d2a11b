/// Request authentication
///
/// Protected routes accept the access token from the `access` cookie or,
/// failing that, from an `Authorization: Bearer` header. A valid token
/// yields an [`AuthContext`] which the router layer stores in the request
/// extensions for handlers to extract.
///
/// This module also builds the `Set-Cookie` values for login, refresh and
/// logout.
///
/// # Example
///
/// ```
/// use axum::http::{header, HeaderMap, HeaderValue};
/// use taskboard_shared::auth::middleware::extract_access_token;
///
/// let mut headers = HeaderMap::new();
/// headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
/// assert_eq!(extract_access_token(&headers), Some("abc.def.ghi".to_string()));
/// ```

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::tokens::{authenticate, TokenConfig};
use crate::error::DomainError;

/// Name of the cookie carrying the access token
pub const ACCESS_COOKIE: &str = "access";

/// Authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,

    /// Session the access token was issued for
    pub session_id: Uuid,
}

/// Finds the access token of a request: the `access` cookie first, then a Bearer header
pub fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    cookie_value(headers, ACCESS_COOKIE).or_else(|| bearer_token(headers))
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Authenticates a request from its headers
///
/// # Errors
///
/// - `Unauthorized` when no token is present or it is invalid
/// - `TokenExpired` when the token is well formed but expired
pub fn authenticate_headers(config: &TokenConfig, headers: &HeaderMap) -> Result<AuthContext, DomainError> {
    let token = extract_access_token(headers).ok_or(DomainError::Unauthorized)?;
    let claims = authenticate(config, &token)?;

    Ok(AuthContext {
        user_id: claims.sub,
        session_id: claims.sid,
    })
}

/// `Set-Cookie` value carrying a fresh access token
pub fn access_cookie(token: &str, max_age_seconds: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        ACCESS_COOKIE,
        token,
        max_age_seconds.max(0)
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes the access cookie
pub fn clear_access_cookie(secure: bool) -> String {
    access_cookie("", 0, secure)
}
