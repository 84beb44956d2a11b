/// Database models for Taskboard
///
/// Plain data structs mapped with `sqlx::FromRow`, plus the SQL each entity
/// needs. Query functions take any `PgExecutor`, so the same function runs
/// against the pool or inside a transaction. Business rules live in
/// `service` and `auth`; these modules only read and write rows.
///
/// # Models
///
/// - `user`: accounts, profiles and credentials
/// - `unverified_user`: invitations sent before signup
/// - `session`: refresh-token lineages
/// - `project`: projects and memberships
/// - `section`: board columns of a project
/// - `task`: tasks with priority and work timer
/// - `task_message`: append-only task activity

pub mod project;
pub mod section;
pub mod session;
pub mod task;
pub mod task_message;
pub mod unverified_user;
pub mod user;
