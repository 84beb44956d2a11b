/// API route handlers
///
/// One module per resource:
///
/// - `health`: health check
/// - `auth`: login, refresh, logout and signup
/// - `project`: projects and their members
/// - `section`: sections of a project
/// - `task`: tasks and their timers
/// - `user`: the current user

pub mod auth;
pub mod health;
pub mod project;
pub mod section;
pub mod task;
pub mod user;
