/// Current user endpoints
///
/// - `GET /api/user/users/me` - Account and profile of the caller
/// - `PATCH /api/user/users/me` - Edit account (username, email) and profile fields

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use serde::Deserialize;
use taskboard_shared::{
    auth::middleware::AuthContext,
    models::user::{UpdateUser, UserMe},
    service::user,
};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMeRequest {
    #[validate(length(min = 1, max = 64, message = "Username must be 1-64 characters"))]
    pub username: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 100))]
    pub surname: Option<String>,

    #[validate(length(max = 100))]
    pub patronymic: Option<String>,

    #[validate(length(max = 32))]
    pub phone: Option<String>,

    /// Job title
    #[validate(length(max = 100))]
    pub position: Option<String>,
}

pub async fn get_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UserMe>> {
    let me = user::me(&*state.store, auth.user_id).await?;
    Ok(Json(me))
}

/// Update the caller's account and profile
///
/// # Errors
///
/// - `409 Conflict`: `auth_data_is_not_unique` when the username or email
///   belongs to someone else
pub async fn update_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    body: Result<Json<UpdateMeRequest>, JsonRejection>,
) -> ApiResult<Json<UserMe>> {
    let Json(req) = body?;
    req.validate()?;

    let data = UpdateUser {
        username: req.username,
        email: req.email,
        name: req.name,
        surname: req.surname,
        patronymic: req.patronymic,
        phone: req.phone,
        position: req.position,
    };
    let me = user::update_me(&*state.store, auth.user_id, data).await?;
    Ok(Json(me))
}
