//! User profile endpoints

use axum::{extract::State, Extension, Json};

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::routes::auth::AuthenticatedUser;
use crate::routes::extract::ApiJson;
use crate::AppState;

/// GET /api/user
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<UserProfile>> {
    let user = state
        .db
        .get_user(&auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user.into()))
}

/// POST /api/user
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    ApiJson(request): ApiJson<UpdateUserRequest>,
) -> Result<Json<UserProfile>> {
    if request.age.is_some_and(|age| !(0..=150).contains(&age)) {
        return Err(ApiError::BadRequest("age must be between 0 and 150".to_string()));
    }

    let user = state.db.update_user_profile(&auth.user_id, &request).await?;
    tracing::info!(user_id = %auth.user_id, "Updated profile");

    Ok(Json(user.into()))
}
