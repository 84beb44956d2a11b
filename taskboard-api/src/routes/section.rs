/// Section endpoints, scoped to one project
///
/// - `POST /api/sections/:project_id/section`
/// - `GET /api/sections/:project_id/section`
/// - `GET|PATCH|DELETE /api/sections/:project_id/section/:section_id`
///
/// Deleting a section deletes its tasks and their messages.

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use taskboard_shared::{
    auth::middleware::AuthContext,
    models::section::{CreateSection, Section, UpdateSection},
    service::section,
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSectionRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[serde(default)]
    #[validate(range(min = 0, message = "Position must not be negative"))]
    pub position: i32,

    /// CSS color, e.g. `#ff8800`
    #[validate(length(max = 32, message = "Color must be at most 32 characters"))]
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSectionRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(range(min = 0, message = "Position must not be negative"))]
    pub position: Option<i32>,

    #[validate(length(max = 32, message = "Color must be at most 32 characters"))]
    pub color: Option<String>,
}

pub async fn create_section(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<CreateSectionRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Section>)> {
    let Path(project_id) = path?;
    let Json(req) = body?;
    req.validate()?;

    let data = CreateSection {
        name: req.name,
        position: req.position,
        color: req.color,
    };
    let created = section::create_section(&*state.store, auth.user_id, project_id, data).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_sections(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Vec<Section>>> {
    let Path(project_id) = path?;
    let sections = section::list_sections(&*state.store, auth.user_id, project_id).await?;
    Ok(Json(sections))
}

pub async fn get_section(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    path: Result<Path<(Uuid, Uuid)>, PathRejection>,
) -> ApiResult<Json<Section>> {
    let Path((project_id, section_id)) = path?;
    let found = section::get_section(&*state.store, auth.user_id, project_id, section_id).await?;
    Ok(Json(found))
}

pub async fn update_section(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    path: Result<Path<(Uuid, Uuid)>, PathRejection>,
    body: Result<Json<UpdateSectionRequest>, JsonRejection>,
) -> ApiResult<Json<Section>> {
    let Path((project_id, section_id)) = path?;
    let Json(req) = body?;
    req.validate()?;

    let data = UpdateSection {
        name: req.name,
        position: req.position,
        color: req.color,
    };
    let updated = section::update_section(&*state.store, auth.user_id, project_id, section_id, data).await?;
    Ok(Json(updated))
}

pub async fn delete_section(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    path: Result<Path<(Uuid, Uuid)>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path((project_id, section_id)) = path?;
    section::delete_section(&*state.store, auth.user_id, project_id, section_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
