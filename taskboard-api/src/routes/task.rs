/// Task endpoints
///
/// # Endpoints
///
/// - `POST /api/task/` - Create a task in a section
/// - `GET /api/task/all/?project_id=` - Tasks of a project
/// - `GET /api/task/:id` - Task with creator, executor and message log
/// - `PATCH /api/task/:id` - Partial update; section moves and executor
///   changes are narrated in the message log
/// - `DELETE /api/task/:id` - Delete with its messages
/// - `POST /api/task/:id/start_counter` - Start the timer
/// - `PUT /api/task/:id/stop_counter` - Stop the timer and add the elapsed seconds

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use taskboard_shared::{
    auth::middleware::AuthContext,
    models::task::{CreateTask, Task, TaskDetails, TaskPriority, UpdateTask},
    service::task,
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    pub project_id: Uuid,
    pub section_id: Uuid,

    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    pub description: Option<String>,
    pub executor_id: Option<Uuid>,

    #[serde(default)]
    pub priority: TaskPriority,

    pub deadline: Option<DateTime<Utc>>,

    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update; absent fields stay unchanged
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    pub section_id: Option<Uuid>,

    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    pub description: Option<String>,
    pub executor_id: Option<Uuid>,
    pub priority: Option<TaskPriority>,
    pub deadline: Option<DateTime<Utc>>,
    pub finished: Option<bool>,

    /// Seconds spent on the task
    #[validate(range(min = 0, message = "Completion time must not be negative"))]
    pub completion_time: Option<i64>,

    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    pub project_id: Uuid,
}

impl From<UpdateTaskRequest> for UpdateTask {
    fn from(req: UpdateTaskRequest) -> Self {
        Self {
            section_id: req.section_id,
            name: req.name,
            description: req.description,
            executor_id: req.executor_id,
            priority: req.priority,
            deadline: req.deadline,
            finished: req.finished,
            completion_time: req.completion_time,
            tags: req.tags,
        }
    }
}

/// Create a task
///
/// # Errors
///
/// - `403 Forbidden`: `access_denied` for non-members
/// - `404 Not Found`: `project_not_found`, `section_is_not_found`, or
///   `user_not_found` when the executor is not a member
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    body: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let Json(req) = body?;
    req.validate()?;

    let data = CreateTask {
        project_id: req.project_id,
        section_id: req.section_id,
        name: req.name,
        description: req.description,
        executor_id: req.executor_id,
        priority: req.priority,
        deadline: req.deadline,
        tags: req.tags,
    };
    let created = task::create_task(&*state.store, auth.user_id, data).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    query: Result<Query<ListTasksQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Task>>> {
    let Query(query) = query?;
    let tasks = task::list_tasks(&*state.store, auth.user_id, query.project_id).await?;
    Ok(Json(tasks))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<TaskDetails>> {
    let Path(task_id) = id?;
    let details = task::get_task(&*state.store, auth.user_id, task_id).await?;
    Ok(Json(details))
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> ApiResult<Json<Task>> {
    let Path(task_id) = id?;
    let Json(req) = body?;
    req.validate()?;

    let updated = task::update_task(&*state.store, auth.user_id, task_id, req.into(), Utc::now()).await?;
    Ok(Json(updated))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(task_id) = id?;
    task::delete_task(&*state.store, auth.user_id, task_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Start the task timer
///
/// # Errors
///
/// - `409 Conflict`: `timer_already_running`
pub async fn start_counter(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Task>> {
    let Path(task_id) = id?;
    let started = task::start_timer(&*state.store, auth.user_id, task_id, Utc::now()).await?;
    Ok(Json(started))
}

/// Stop the task timer
///
/// # Errors
///
/// - `409 Conflict`: `timer_not_running`
pub async fn stop_counter(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Task>> {
    let Path(task_id) = id?;
    let stopped = task::stop_timer(&*state.store, auth.user_id, task_id, Utc::now()).await?;
    Ok(Json(stopped))
}
