/// PostgreSQL store
///
/// Single-statement operations run directly on the pool. Compound operations
/// open a transaction, call the model functions on it and commit; dropping
/// the transaction on an early `?` rolls everything back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::{
    ProjectRepository, SectionRepository, SessionRepository, Store, StoreResult, TaskRepository,
    UserRepository,
};
use crate::activity::{pending_messages, ChangeMessage};
use crate::db::pool::health_check;
use crate::models::project::{CreateProject, Project, ProjectMember, UpdateProject, DEFAULT_SECTIONS};
use crate::models::section::{CreateSection, Section, UpdateSection};
use crate::models::session::{NewSession, Session};
use crate::models::task::{CreateTask, Task, UpdateTask};
use crate::models::task_message::{NewTaskMessage, TaskMessage};
use crate::models::unverified_user::UnverifiedUser;
use crate::models::user::{CreateUser, UpdateUser, User, UserCredentials, UserProfile};

/// [`Store`] backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_credentials(&self, login: &str) -> StoreResult<Option<UserCredentials>> {
        Ok(User::find_credentials(&self.pool, login).await?)
    }

    async fn login_taken(
        &self,
        email: Option<&str>,
        username: Option<&str>,
        except: Option<Uuid>,
    ) -> StoreResult<bool> {
        Ok(User::is_taken(&self.pool, email, username, except).await?)
    }

    async fn create_user(&self, data: &CreateUser) -> StoreResult<User> {
        let mut tx = self.pool.begin().await?;
        let user = User::insert(&mut tx, data).await?;
        tx.commit().await?;

        debug!(user_id = %user.id, "User row and profile committed");
        Ok(user)
    }

    async fn find_profile(&self, user_id: Uuid) -> StoreResult<Option<UserProfile>> {
        Ok(UserProfile::find(&self.pool, user_id).await?)
    }

    async fn find_profiles(&self, user_ids: &[Uuid]) -> StoreResult<Vec<UserProfile>> {
        Ok(UserProfile::find_many(&self.pool, user_ids).await?)
    }

    async fn update_user(&self, id: Uuid, data: &UpdateUser) -> StoreResult<Option<User>> {
        let mut tx = self.pool.begin().await?;
        let user = User::update(&mut tx, id, data).await?;
        tx.commit().await?;
        Ok(user)
    }

    async fn find_users_by_identifiers(&self, identifiers: &[String]) -> StoreResult<Vec<User>> {
        Ok(User::find_by_identifiers(&self.pool, identifiers).await?)
    }

    async fn add_pending_invite(&self, email: &str, project_id: Uuid) -> StoreResult<()> {
        Ok(UnverifiedUser::upsert(&self.pool, email, project_id).await?)
    }

    async fn resolve_pending_invite(&self, email: &str, user_id: Uuid) -> StoreResult<Vec<Uuid>> {
        let mut tx = self.pool.begin().await?;

        let Some(invite) = UnverifiedUser::take(&mut *tx, email).await? else {
            return Ok(Vec::new());
        };

        let mut joined = Vec::with_capacity(invite.project_ids.len());
        for project_id in invite.project_ids {
            // The project may have been deleted since the invitation was sent
            if Project::find_by_id(&mut *tx, project_id).await?.is_none() {
                continue;
            }
            Project::add_members(&mut *tx, project_id, &[user_id]).await?;
            joined.push(project_id);
        }

        tx.commit().await?;
        Ok(joined)
    }
}

#[async_trait]
impl SessionRepository for PgStore {
    async fn create_session(&self, data: &NewSession) -> StoreResult<Session> {
        Ok(Session::create(&self.pool, data).await?)
    }

    async fn find_session(&self, id: Uuid) -> StoreResult<Option<Session>> {
        Ok(Session::find_by_id(&self.pool, id).await?)
    }

    async fn rotate_session(
        &self,
        id: Uuid,
        expected_hash: &str,
        new_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        Ok(Session::rotate(&self.pool, id, expected_hash, new_hash, expires_at).await?)
    }

    async fn delete_session(&self, id: Uuid) -> StoreResult<bool> {
        Ok(Session::delete(&self.pool, id).await?)
    }
}

#[async_trait]
impl ProjectRepository for PgStore {
    async fn create_project(&self, owner: Uuid, data: &CreateProject) -> StoreResult<Project> {
        let mut tx = self.pool.begin().await?;

        let project = Project::insert(&mut *tx, owner, data).await?;
        Project::add_members(&mut *tx, project.id, &[owner]).await?;

        for (index, name) in DEFAULT_SECTIONS.iter().enumerate() {
            let section = CreateSection {
                name: (*name).to_string(),
                position: index as i32 + 1,
                color: None,
            };
            Section::insert(&mut *tx, project.id, &section).await?;
        }

        tx.commit().await?;
        Ok(project)
    }

    async fn find_project(&self, id: Uuid) -> StoreResult<Option<Project>> {
        Ok(Project::find_by_id(&self.pool, id).await?)
    }

    async fn find_project_by_name(&self, name: &str) -> StoreResult<Option<Project>> {
        Ok(Project::find_by_name(&self.pool, name).await?)
    }

    async fn list_projects_for_member(&self, user_id: Uuid) -> StoreResult<Vec<Project>> {
        Ok(Project::list_for_member(&self.pool, user_id).await?)
    }

    async fn update_project(&self, id: Uuid, data: &UpdateProject) -> StoreResult<Option<Project>> {
        Ok(Project::update(&self.pool, id, data).await?)
    }

    async fn delete_project(&self, id: Uuid) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;
        let deleted = Project::delete_cascade(&mut tx, id).await?;
        tx.commit().await?;
        Ok(deleted)
    }

    async fn is_member(&self, project_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        Ok(Project::is_member(&self.pool, project_id, user_id).await?)
    }

    async fn list_members(&self, project_id: Uuid) -> StoreResult<Vec<ProjectMember>> {
        Ok(Project::list_members(&self.pool, project_id).await?)
    }

    async fn add_members(&self, project_id: Uuid, user_ids: &[Uuid]) -> StoreResult<u64> {
        Ok(Project::add_members(&self.pool, project_id, user_ids).await?)
    }

    async fn remove_members(&self, project_id: Uuid, user_ids: &[Uuid]) -> StoreResult<u64> {
        Ok(Project::remove_members(&self.pool, project_id, user_ids).await?)
    }
}

#[async_trait]
impl SectionRepository for PgStore {
    async fn create_section(&self, project_id: Uuid, data: &CreateSection) -> StoreResult<Section> {
        Ok(Section::insert(&self.pool, project_id, data).await?)
    }

    async fn list_sections(&self, project_id: Uuid) -> StoreResult<Vec<Section>> {
        Ok(Section::list_for_project(&self.pool, project_id).await?)
    }

    async fn find_section(&self, id: Uuid) -> StoreResult<Option<Section>> {
        Ok(Section::find_by_id(&self.pool, id).await?)
    }

    async fn update_section(&self, id: Uuid, data: &UpdateSection) -> StoreResult<Option<Section>> {
        Ok(Section::update(&self.pool, id, data).await?)
    }

    async fn delete_section(&self, id: Uuid) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;
        let deleted = Section::delete_cascade(&mut tx, id).await?;
        tx.commit().await?;
        Ok(deleted)
    }
}

#[async_trait]
impl TaskRepository for PgStore {
    async fn create_task(&self, created_by: Uuid, data: &CreateTask) -> StoreResult<Task> {
        Ok(Task::insert(&self.pool, created_by, data).await?)
    }

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(Task::find_by_id(&self.pool, id).await?)
    }

    async fn list_tasks_for_project(&self, project_id: Uuid) -> StoreResult<Vec<Task>> {
        Ok(Task::list_for_project(&self.pool, project_id).await?)
    }

    async fn list_messages(&self, task_id: Uuid) -> StoreResult<Vec<TaskMessage>> {
        Ok(TaskMessage::list_for_task(&self.pool, task_id).await?)
    }

    async fn update_task(
        &self,
        id: Uuid,
        update: &UpdateTask,
        messages: Vec<ChangeMessage>,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Task>> {
        let mut tx = self.pool.begin().await?;

        let Some(mut task) = Task::find_for_update(&mut *tx, id).await? else {
            return Ok(None);
        };

        for message in pending_messages(&task, messages) {
            TaskMessage::insert(&mut *tx, id, &message, at).await?;
        }

        task.apply(update, at);
        let task = Task::save(&mut *tx, &task).await?;

        tx.commit().await?;
        Ok(Some(task))
    }

    async fn start_timer(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        message: &NewTaskMessage,
    ) -> StoreResult<Option<Task>> {
        let mut tx = self.pool.begin().await?;

        let Some(mut task) = Task::find_for_update(&mut *tx, id).await? else {
            return Ok(None);
        };
        if task.timer_running() {
            return Ok(None);
        }

        task.timer_started_at = Some(at);
        task.updated_at = at;
        TaskMessage::insert(&mut *tx, id, message, at).await?;
        let task = Task::save(&mut *tx, &task).await?;

        tx.commit().await?;
        Ok(Some(task))
    }

    async fn stop_timer(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        message: &NewTaskMessage,
    ) -> StoreResult<Option<Task>> {
        let mut tx = self.pool.begin().await?;

        let Some(mut task) = Task::find_for_update(&mut *tx, id).await? else {
            return Ok(None);
        };
        if !task.timer_running() {
            return Ok(None);
        }

        let elapsed = task.elapsed_seconds(at);
        task.completion_time += elapsed;
        task.timer_started_at = None;
        task.updated_at = at;
        TaskMessage::insert(&mut *tx, id, message, at).await?;
        let task = Task::save(&mut *tx, &task).await?;

        tx.commit().await?;
        Ok(Some(task))
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;
        let deleted = Task::delete_cascade(&mut tx, id).await?;
        tx.commit().await?;
        Ok(deleted)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(health_check(&self.pool).await?)
    }
}
