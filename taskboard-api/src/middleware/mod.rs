/// Middleware for the API server
///
/// - `auth`: access-token authentication for protected routes
/// - `security`: security response headers

pub mod auth;
pub mod security;
