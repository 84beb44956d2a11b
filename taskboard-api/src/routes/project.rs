/// Project endpoints
///
/// # Endpoints
///
/// - `POST /api/project/` - Create a project with the default sections
/// - `GET /api/project/all/` - Projects of the caller, with sections
/// - `GET /api/project/:id` - Project detail with sections
/// - `PATCH /api/project/:id` - Rename or change icon (owner only)
/// - `DELETE /api/project/:id` - Delete with everything inside (owner only)
/// - `GET /api/project/:id/users` - Members
/// - `POST /api/project/:id/users` - Add members by email or username
/// - `DELETE /api/project/:id/users` - Remove members (owner only)

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use taskboard_shared::{
    auth::middleware::AuthContext,
    models::project::{CreateProject, Project, ProjectMember, ProjectWithSections, UpdateProject},
    service::project::{self, AddedMembers},
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    /// Icon from the fixed set; defaults to the first one
    #[validate(range(min = 1, message = "Unknown icon"))]
    pub icon_id: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(range(min = 1, message = "Unknown icon"))]
    pub icon_id: Option<i32>,
}

/// Emails or usernames to add
#[derive(Debug, Deserialize, Validate)]
pub struct AddMembersRequest {
    #[validate(length(min = 1, message = "At least one user is required"))]
    pub users: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RemoveMembersRequest {
    #[validate(length(min = 1, message = "At least one user is required"))]
    pub users: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct RemoveMembersResponse {
    pub removed: u64,
}

/// Create a project
///
/// # Errors
///
/// - `409 Conflict`: `project_name_is_not_unique`
/// - `422 Unprocessable Entity`: empty or overlong name
pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    body: Result<Json<CreateProjectRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ProjectWithSections>)> {
    let Json(req) = body?;
    req.validate()?;

    let data = CreateProject {
        name: req.name,
        icon_id: req.icon_id.unwrap_or(1),
    };
    let created = project::create_project(&*state.store, auth.user_id, data).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<ProjectWithSections>>> {
    let projects = project::list_projects(&*state.store, auth.user_id).await?;
    Ok(Json(projects))
}

pub async fn get_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<ProjectWithSections>> {
    let Path(project_id) = id?;
    let found = project::get_project(&*state.store, auth.user_id, project_id).await?;
    Ok(Json(found))
}

/// Update a project (owner only)
///
/// # Errors
///
/// - `403 Forbidden`: `access_denied` for members other than the owner
/// - `409 Conflict`: `project_name_is_not_unique`
pub async fn update_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<UpdateProjectRequest>, JsonRejection>,
) -> ApiResult<Json<Project>> {
    let Path(project_id) = id?;
    let Json(req) = body?;
    req.validate()?;

    let data = UpdateProject {
        name: req.name,
        icon_id: req.icon_id,
    };
    let updated = project::update_project(&*state.store, auth.user_id, project_id, data).await?;
    Ok(Json(updated))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(project_id) = id?;
    project::delete_project(&*state.store, auth.user_id, project_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_members(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Vec<ProjectMember>>> {
    let Path(project_id) = id?;
    let members = project::list_members(&*state.store, auth.user_id, project_id).await?;
    Ok(Json(members))
}

/// Add members by email or username
///
/// Emails without an account are kept as invitations and turn into
/// memberships when that email signs up.
///
/// # Response
///
/// ```json
/// { "added": ["uuid"], "invited": ["new.user@example.com"] }
/// ```
pub async fn add_members(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<AddMembersRequest>, JsonRejection>,
) -> ApiResult<Json<AddedMembers>> {
    let Path(project_id) = id?;
    let Json(req) = body?;
    req.validate()?;

    let added = project::add_members(&*state.store, auth.user_id, project_id, req.users).await?;
    Ok(Json(added))
}

pub async fn remove_members(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<RemoveMembersRequest>, JsonRejection>,
) -> ApiResult<Json<RemoveMembersResponse>> {
    let Path(project_id) = id?;
    let Json(req) = body?;
    req.validate()?;

    let removed = project::remove_members(&*state.store, auth.user_id, project_id, req.users).await?;
    Ok(Json(RemoveMembersResponse { removed }))
}
