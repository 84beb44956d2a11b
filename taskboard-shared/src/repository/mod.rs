/// Persistence interfaces
///
/// One async trait per entity, exposing only the query shapes the services
/// use. Compound operations (create a project with its sections, update a
/// task together with its activity messages, rotate a refresh token) are
/// single trait methods so every implementation can make them atomic.
///
/// Two implementations ship with the crate:
///
/// - [`postgres::PgStore`]: PostgreSQL through sqlx, one transaction per compound operation
/// - [`memory::MemoryStore`]: in-process fake under one mutex, used by tests
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskboard_shared::repository::{memory::MemoryStore, Store};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
/// store.ping().await?;
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::activity::ChangeMessage;
use crate::models::project::{CreateProject, Project, ProjectMember, UpdateProject};
use crate::models::section::{CreateSection, Section, UpdateSection};
use crate::models::session::{NewSession, Session};
use crate::models::task::{CreateTask, Task, UpdateTask};
use crate::models::task_message::{NewTaskMessage, TaskMessage};
use crate::models::user::{CreateUser, UpdateUser, User, UserCredentials, UserProfile};

/// Persistence failure
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// A unique constraint rejected the write
    #[error("Conflicting record: {0}")]
    Conflict(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(db.constraint().unwrap_or("unique").to_string())
            }
            _ => StoreError::Database(err),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Accounts, profiles and deferred invitations
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Looks up a login: the email case-insensitively or the username exactly
    async fn find_credentials(&self, login: &str) -> StoreResult<Option<UserCredentials>>;

    /// Whether another account (other than `except`) uses the email or username
    async fn login_taken(
        &self,
        email: Option<&str>,
        username: Option<&str>,
        except: Option<Uuid>,
    ) -> StoreResult<bool>;

    /// Creates the account and its profile atomically
    async fn create_user(&self, data: &CreateUser) -> StoreResult<User>;

    async fn find_profile(&self, user_id: Uuid) -> StoreResult<Option<UserProfile>>;

    async fn find_profiles(&self, user_ids: &[Uuid]) -> StoreResult<Vec<UserProfile>>;

    /// Updates the account and profile atomically
    async fn update_user(&self, id: Uuid, data: &UpdateUser) -> StoreResult<Option<User>>;

    /// Accounts whose email (case-insensitive) or username is listed
    async fn find_users_by_identifiers(&self, identifiers: &[String]) -> StoreResult<Vec<User>>;

    /// Records a deferred invitation of `email` to a project
    async fn add_pending_invite(&self, email: &str, project_id: Uuid) -> StoreResult<()>;

    /// Turns the pending invitation of `email` into memberships of `user_id`
    ///
    /// Deletes the invitation and returns the projects joined. Atomic.
    async fn resolve_pending_invite(&self, email: &str, user_id: Uuid) -> StoreResult<Vec<Uuid>>;
}

/// Refresh-token sessions
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create_session(&self, data: &NewSession) -> StoreResult<Session>;

    async fn find_session(&self, id: Uuid) -> StoreResult<Option<Session>>;

    /// Swaps the refresh-token digest if it still equals `expected_hash`
    ///
    /// Returns `false` when another rotation won or the session is gone.
    async fn rotate_session(
        &self,
        id: Uuid,
        expected_hash: &str,
        new_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    async fn delete_session(&self, id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Creates the project, the owner membership and the default sections atomically
    async fn create_project(&self, owner: Uuid, data: &CreateProject) -> StoreResult<Project>;

    async fn find_project(&self, id: Uuid) -> StoreResult<Option<Project>>;

    async fn find_project_by_name(&self, name: &str) -> StoreResult<Option<Project>>;

    async fn list_projects_for_member(&self, user_id: Uuid) -> StoreResult<Vec<Project>>;

    async fn update_project(&self, id: Uuid, data: &UpdateProject) -> StoreResult<Option<Project>>;

    /// Deletes memberships, messages, tasks, sections and the project atomically
    async fn delete_project(&self, id: Uuid) -> StoreResult<bool>;

    async fn is_member(&self, project_id: Uuid, user_id: Uuid) -> StoreResult<bool>;

    async fn list_members(&self, project_id: Uuid) -> StoreResult<Vec<ProjectMember>>;

    /// Adds members, ignoring existing ones; returns how many were added
    async fn add_members(&self, project_id: Uuid, user_ids: &[Uuid]) -> StoreResult<u64>;

    /// Removes members other than the owner; returns how many were removed
    async fn remove_members(&self, project_id: Uuid, user_ids: &[Uuid]) -> StoreResult<u64>;
}

#[async_trait]
pub trait SectionRepository: Send + Sync {
    async fn create_section(&self, project_id: Uuid, data: &CreateSection) -> StoreResult<Section>;

    /// Sections of a project ordered by position
    async fn list_sections(&self, project_id: Uuid) -> StoreResult<Vec<Section>>;

    async fn find_section(&self, id: Uuid) -> StoreResult<Option<Section>>;

    async fn update_section(&self, id: Uuid, data: &UpdateSection) -> StoreResult<Option<Section>>;

    /// Deletes the section with its tasks and their messages atomically
    async fn delete_section(&self, id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn create_task(&self, created_by: Uuid, data: &CreateTask) -> StoreResult<Task>;

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>>;

    async fn list_tasks_for_project(&self, project_id: Uuid) -> StoreResult<Vec<Task>>;

    async fn list_messages(&self, task_id: Uuid) -> StoreResult<Vec<TaskMessage>>;

    /// Appends the messages whose change still applies to the locked row,
    /// then applies the update, in one transaction
    async fn update_task(
        &self,
        id: Uuid,
        update: &UpdateTask,
        messages: Vec<ChangeMessage>,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Task>>;

    /// Starts the timer at `at` and appends `message`
    ///
    /// Returns `None` when the task is missing or its timer already runs;
    /// nothing is written in that case.
    async fn start_timer(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        message: &NewTaskMessage,
    ) -> StoreResult<Option<Task>>;

    /// Stops the timer, adds the elapsed seconds and appends `message`
    ///
    /// Returns `None` when the task is missing or its timer is not running.
    async fn stop_timer(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        message: &NewTaskMessage,
    ) -> StoreResult<Option<Task>>;

    /// Deletes the task's messages and then the task
    async fn delete_task(&self, id: Uuid) -> StoreResult<bool>;
}

/// Everything the application needs from persistence
#[async_trait]
pub trait Store:
    UserRepository + SessionRepository + ProjectRepository + SectionRepository + TaskRepository
{
    /// Checks that the backing storage answers
    async fn ping(&self) -> StoreResult<()>;
}
