//! Diary generation settings endpoints

use axum::{extract::State, Extension, Json};

use crate::error::Result;
use crate::models::*;
use crate::routes::auth::AuthenticatedUser;
use crate::routes::extract::ApiJson;
use crate::routes::reject_nul;
use crate::AppState;

/// GET /api/settings
///
/// Defaults when nothing (or nothing readable) is stored.
pub async fn get_settings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<DiarySettings>> {
    let settings = state
        .db
        .get_diary_settings(&auth.user_id)
        .await?
        .unwrap_or_default();

    Ok(Json(settings))
}

/// POST /api/settings
///
/// Unknown styles or languages are rejected by deserialization.
pub async fn save_settings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    ApiJson(settings): ApiJson<DiarySettings>,
) -> Result<Json<SaveSettingsResponse>> {
    reject_nul([("custom_prompt", Some(settings.custom_prompt.as_str()))])?;

    state.db.set_diary_settings(&auth.user_id, &settings).await?;
    tracing::info!(
        user_id = %auth.user_id,
        style = settings.style.as_str(),
        language = settings.language.as_str(),
        "Saved diary settings"
    );

    Ok(Json(SaveSettingsResponse {
        success: true,
        settings,
    }))
}
