//! Timeline endpoints

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use dayflow_core::emoji::needs_emoji;
use dayflow_core::normalize_spending;

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::routes::auth::AuthenticatedUser;
use crate::routes::extract::{ApiJson, ApiQuery};
use crate::routes::diary::require_diary;
use crate::routes::{parse_uuid, reject_nul};
use crate::services::enrichment;
use crate::AppState;

fn event_not_found() -> ApiError {
    ApiError::NotFound("Timeline event not found".to_string())
}

/// GET /api/timeline
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    ApiQuery(query): ApiQuery<TimelineQuery>,
) -> Result<Json<TimelineResponse>> {
    let diary_id = parse_uuid(&query.diary_id, "diary_id")?;
    require_diary(&state, &auth.user_id, diary_id).await?;

    let timeline = state.db.get_active_timeline(&auth.user_id, diary_id).await?;
    Ok(Json(TimelineResponse { timeline }))
}

/// GET /api/timeline/{id}
///
/// Soft-deleted entries are still returned here.
pub async fn get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<DbTimelineEvent>> {
    let event_id = parse_uuid(&id, "event id")?;
    let event = state
        .db
        .get_timeline_event(&auth.user_id, event_id)
        .await?
        .ok_or_else(event_not_found)?;

    Ok(Json(event))
}

/// POST /api/timeline/add
pub async fn add(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    ApiJson(request): ApiJson<AddEventRequest>,
) -> Result<Json<EventResponse>> {
    let diary_id = parse_uuid(&request.diary_id, "diary_id")?;
    reject_nul(request.event.text_fields())?;
    require_diary(&state, &auth.user_id, diary_id).await?;

    let mut draft = request.event.into_draft(0)?;
    if needs_emoji(Some(&draft.emoji)) {
        let emojis =
            enrichment::assign_emojis(state.llm.as_ref(), &[draft.title.clone()]).await;
        if let Some(emoji) = emojis.into_iter().next() {
            draft.emoji = emoji;
        }
    }

    let event = state
        .db
        .insert_timeline_entries(diary_id, std::slice::from_ref(&draft))
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::Internal("Insert returned no row".to_string()))?;
    tracing::info!(diary_id = %diary_id, event_id = %event.id, "Added timeline event");

    Ok(Json(EventResponse { event }))
}

/// PUT /api/timeline/spending
pub async fn update_spending(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    ApiJson(request): ApiJson<UpdateSpendingRequest>,
) -> Result<Json<DbTimelineEvent>> {
    let event_id = parse_uuid(&request.event_id, "event_id")?;
    let amount = normalize_spending(request.spending);

    let event = state
        .db
        .update_spending(&auth.user_id, event_id, amount)
        .await?
        .ok_or_else(event_not_found)?;

    Ok(Json(event))
}

/// DELETE /api/timeline/{id}
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<EventResponse>> {
    let event_id = parse_uuid(&id, "event id")?;
    let event = state
        .db
        .soft_delete_event(&auth.user_id, event_id)
        .await?
        .ok_or_else(event_not_found)?;
    tracing::info!(event_id = %event_id, "Soft-deleted timeline event");

    Ok(Json(EventResponse { event }))
}

/// POST /api/timeline/{id}/restore
pub async fn restore(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<EventResponse>> {
    let event_id = parse_uuid(&id, "event id")?;
    let event = state
        .db
        .restore_event(&auth.user_id, event_id)
        .await?
        .ok_or_else(event_not_found)?;

    Ok(Json(EventResponse { event }))
}
