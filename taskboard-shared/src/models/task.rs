/// Task model and database operations
///
/// A task belongs to exactly one section and, through it, to one project.
/// Besides its descriptive fields it carries a work timer: `timer_started_at`
/// is set while the timer runs and `completion_time` accumulates the elapsed
/// whole seconds of every finished run.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_priority AS ENUM ('low', 'medium', 'high', 'urgent', 'on_fire');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     section_id UUID NOT NULL REFERENCES project_sections(id),
///     name VARCHAR(255) NOT NULL,
///     description TEXT,
///     created_by UUID NOT NULL REFERENCES users(id),
///     executor_id UUID REFERENCES users(id),
///     priority task_priority NOT NULL DEFAULT 'medium',
///     deadline TIMESTAMPTZ,
///     finished BOOLEAN NOT NULL DEFAULT FALSE,
///     finished_at TIMESTAMPTZ,
///     completion_time BIGINT NOT NULL DEFAULT 0,
///     timer_started_at TIMESTAMPTZ,
///     tags TEXT[] NOT NULL DEFAULT '{}',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::models::task::{CreateTask, Task, TaskPriority};
/// use taskboard_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
/// let author = Uuid::new_v4();
///
/// let task = Task::insert(&pool, author, &CreateTask {
///     project_id: Uuid::new_v4(),
///     section_id: Uuid::new_v4(),
///     name: "Prepare release notes".to_string(),
///     description: None,
///     executor_id: None,
///     priority: TaskPriority::High,
///     deadline: None,
///     tags: vec!["release".to_string()],
/// }).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::task_message::TaskMessage;
use crate::models::user::UserSummary;

const TASK_COLUMNS: &str = "id, section_id, name, description, created_by, executor_id, priority, \
     deadline, finished, finished_at, completion_time, timer_started_at, tags, created_at, updated_at";

/// Task priority
///
/// Variants are declared from least to most pressing, so the derived
/// ordering gives `OnFire > Urgent > High > Medium > Low`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "task_priority", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
    OnFire,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::Urgent => "urgent",
            TaskPriority::OnFire => "on_fire",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,

    /// Section the task is in
    pub section_id: Uuid,

    pub name: String,
    pub description: Option<String>,

    /// Author of the task
    pub created_by: Uuid,

    /// Assignee
    pub executor_id: Option<Uuid>,

    pub priority: TaskPriority,
    pub deadline: Option<DateTime<Utc>>,

    pub finished: bool,

    /// Set when `finished` flips to true, cleared when it flips back
    pub finished_at: Option<DateTime<Utc>>,

    /// Accumulated timer seconds
    pub completion_time: i64,

    /// Start of the running timer, `None` when stopped
    pub timer_started_at: Option<DateTime<Utc>>,

    pub tags: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn timer_running(&self) -> bool {
        self.timer_started_at.is_some()
    }

    /// Whole seconds between the timer start and `at`, zero when not running
    pub fn elapsed_seconds(&self, at: DateTime<Utc>) -> i64 {
        self.timer_started_at
            .map(|started| (at - started).num_seconds().max(0))
            .unwrap_or(0)
    }

    /// Applies an update to an in-memory copy of the task
    pub fn apply(&mut self, update: &UpdateTask, now: DateTime<Utc>) {
        if let Some(section_id) = update.section_id {
            self.section_id = section_id;
        }
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(description) = &update.description {
            self.description = Some(description.clone());
        }
        if let Some(executor_id) = update.executor_id {
            self.executor_id = Some(executor_id);
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(deadline) = update.deadline {
            self.deadline = Some(deadline);
        }
        if let Some(finished) = update.finished {
            if finished != self.finished {
                self.finished_at = finished.then_some(now);
            }
            self.finished = finished;
        }
        if let Some(completion_time) = update.completion_time {
            self.completion_time = completion_time;
        }
        if let Some(tags) = &update.tags {
            self.tags = tags.clone();
        }
        self.updated_at = now;
    }
}

/// Input for creating a task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    /// Project the section must belong to
    pub project_id: Uuid,
    pub section_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub executor_id: Option<Uuid>,
    #[serde(default)]
    pub priority: TaskPriority,
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial task update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTask {
    pub section_id: Option<Uuid>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub executor_id: Option<Uuid>,
    pub priority: Option<TaskPriority>,
    pub deadline: Option<DateTime<Utc>>,
    pub finished: Option<bool>,
    pub completion_time: Option<i64>,
    pub tags: Option<Vec<String>>,
}

/// Task with resolved people and its message log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDetails {
    #[serde(flatten)]
    pub task: Task,
    pub creator: Option<UserSummary>,
    pub executor: Option<UserSummary>,
    pub messages: Vec<TaskMessage>,
}

impl Task {
    pub async fn insert<'e, E>(executor: E, created_by: Uuid, data: &CreateTask) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (section_id, name, description, created_by, executor_id, priority, deadline, tags)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(data.section_id)
        .bind(&data.name)
        .bind(&data.description)
        .bind(created_by)
        .bind(data.executor_id)
        .bind(data.priority)
        .bind(data.deadline)
        .bind(&data.tags)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Loads a task and locks its row until the transaction ends
    pub async fn find_for_update<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Lists all tasks of a project, newest first
    pub async fn list_for_project<'e, E>(executor: E, project_id: Uuid) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE section_id IN (SELECT id FROM project_sections WHERE project_id = $1)
            ORDER BY created_at DESC
            "#
        ))
        .bind(project_id)
        .fetch_all(executor)
        .await
    }

    /// Writes every column of an already updated task
    pub async fn save<'e, E>(executor: E, task: &Task) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
            SET section_id = $2, name = $3, description = $4, executor_id = $5,
                priority = $6, deadline = $7, finished = $8, finished_at = $9,
                completion_time = $10, timer_started_at = $11, tags = $12, updated_at = $13
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(task.id)
        .bind(task.section_id)
        .bind(&task.name)
        .bind(&task.description)
        .bind(task.executor_id)
        .bind(task.priority)
        .bind(task.deadline)
        .bind(task.finished)
        .bind(task.finished_at)
        .bind(task.completion_time)
        .bind(task.timer_started_at)
        .bind(&task.tags)
        .bind(task.updated_at)
        .fetch_one(executor)
        .await
    }

    /// Deletes the task and its messages
    ///
    /// Call inside a transaction.
    pub async fn delete_cascade(conn: &mut sqlx::PgConnection, id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query("DELETE FROM task_messages WHERE task_id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn task() -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            section_id: Uuid::new_v4(),
            name: "Write docs".to_string(),
            description: None,
            created_by: Uuid::new_v4(),
            executor_id: None,
            priority: TaskPriority::Medium,
            deadline: None,
            finished: false,
            finished_at: None,
            completion_time: 0,
            timer_started_at: None,
            tags: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_priority_ordering() {
        assert!(TaskPriority::OnFire > TaskPriority::Urgent);
        assert!(TaskPriority::Urgent > TaskPriority::High);
        assert!(TaskPriority::High > TaskPriority::Medium);
        assert!(TaskPriority::Medium > TaskPriority::Low);
        assert_eq!(TaskPriority::default(), TaskPriority::Medium);
    }

    #[test]
    fn test_priority_serialization() {
        let json = serde_json::to_string(&TaskPriority::OnFire).unwrap();
        assert_eq!(json, "\"on_fire\"");
        assert_eq!(TaskPriority::OnFire.as_str(), "on_fire");

        let parsed: TaskPriority = serde_json::from_str("\"urgent\"").unwrap();
        assert_eq!(parsed, TaskPriority::Urgent);
    }

    #[test]
    fn test_elapsed_seconds() {
        let mut task = task();
        let now = Utc::now();
        assert_eq!(task.elapsed_seconds(now), 0);

        task.timer_started_at = Some(now - Duration::milliseconds(90_500));
        assert_eq!(task.elapsed_seconds(now), 90);

        // Clock skew never produces negative time
        task.timer_started_at = Some(now + Duration::seconds(5));
        assert_eq!(task.elapsed_seconds(now), 0);
    }

    #[test]
    fn test_apply_finished_sets_and_clears_timestamp() {
        let mut task = task();
        let now = Utc::now();

        task.apply(&UpdateTask { finished: Some(true), ..Default::default() }, now);
        assert!(task.finished);
        assert_eq!(task.finished_at, Some(now));

        let later = now + Duration::seconds(10);
        task.apply(&UpdateTask { finished: Some(true), ..Default::default() }, later);
        assert_eq!(task.finished_at, Some(now));

        task.apply(&UpdateTask { finished: Some(false), ..Default::default() }, later);
        assert!(!task.finished);
        assert_eq!(task.finished_at, None);
    }

    #[test]
    fn test_apply_leaves_unset_fields() {
        let mut task = task();
        let original = task.clone();
        let now = Utc::now();

        task.apply(&UpdateTask { priority: Some(TaskPriority::OnFire), ..Default::default() }, now);
        assert_eq!(task.priority, TaskPriority::OnFire);
        assert_eq!(task.name, original.name);
        assert_eq!(task.section_id, original.section_id);
        assert_eq!(task.updated_at, now);
    }
}
