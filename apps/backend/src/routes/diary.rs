//! Diary endpoints

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use dayflow_core::diary::{preview_text, primary_emoji, PREVIEW_CHARS};
use dayflow_core::normalize_spending;

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::routes::auth::AuthenticatedUser;
use crate::routes::extract::{ApiJson, ApiQuery};
use crate::routes::{parse_date, parse_uuid, reject_nul};
use crate::services::enrichment;
use crate::AppState;

const DEFAULT_HISTORY_LIMIT: i64 = 30;
const MAX_HISTORY_LIMIT: i64 = 100;

/// Load a diary owned by the caller or answer 404.
pub(crate) async fn require_diary(state: &AppState, user_id: &str, diary_id: Uuid) -> Result<DbDiary> {
    state
        .db
        .get_diary(user_id, diary_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Diary not found".to_string()))
}

/// POST /api/diary/save
pub async fn save(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    ApiJson(request): ApiJson<SaveDiaryRequest>,
) -> Result<Json<SaveDiaryResponse>> {
    let date = parse_date(&request.date)?;
    let diary = request.diary;
    reject_nul(diary.text_fields())?;
    for event in &diary.timeline {
        reject_nul(event.text_fields())?;
    }

    let id = diary
        .id
        .as_deref()
        .map(|id| parse_uuid(id, "diary id"))
        .transpose()?;
    let thumb_event_id = diary
        .thumb_event_id
        .as_deref()
        .map(|id| parse_uuid(id, "thumb_event_id"))
        .transpose()?;

    // Validate every entry before writing anything
    let drafts = diary
        .timeline
        .into_iter()
        .enumerate()
        .map(|(i, event)| event.into_draft(i as i32))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let fields = DiaryWrite {
        diary_text: diary.diary_text,
        spending_insight: diary.spending_insight,
        tomorrow_suggestion: diary.tomorrow_suggestion,
        total_spending: normalize_spending(diary.total_spending),
        thumb_event_id,
        diary_preview: diary.diary_preview,
        primary_emoji: diary.primary_emoji,
        photo_url: diary.photo_url,
    };

    let (saved, timeline_events) = state
        .db
        .save_diary_with_timeline(&auth.user_id, date, id, &fields, &drafts)
        .await?;

    Ok(Json(SaveDiaryResponse {
        diary: saved,
        timeline_events,
    }))
}

/// POST /api/diary/generate
pub async fn generate(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    ApiJson(request): ApiJson<GenerateDiaryRequest>,
) -> Result<Json<DiaryDetail>> {
    let diary_id = parse_uuid(&request.diary_id, "diary_id")?;
    require_diary(&state, &auth.user_id, diary_id).await?;

    let timeline = state.db.get_active_timeline(&auth.user_id, diary_id).await?;
    if timeline.is_empty() {
        return Err(ApiError::BadRequest(
            "Cannot generate a diary for an empty timeline".to_string(),
        ));
    }

    let settings = match request.settings {
        Some(settings) => settings,
        None => state
            .db
            .get_diary_settings(&auth.user_id)
            .await?
            .unwrap_or_default(),
    };

    let generated = enrichment::generate_diary(state.llm.as_ref(), &settings, &timeline).await?;
    let preview = preview_text(&generated.diary_text, PREVIEW_CHARS);
    let emoji = primary_emoji(timeline.iter().map(|e| (e.emoji.as_str(), e.spending)));

    let diary = state
        .db
        .save_generated_diary(&auth.user_id, diary_id, &generated, &preview, emoji.as_deref())
        .await?
        .ok_or_else(|| ApiError::NotFound("Diary not found".to_string()))?;
    let photos = state.db.get_photos(&auth.user_id, diary_id).await?;

    tracing::info!(
        diary_id = %diary_id,
        style = settings.style.as_str(),
        language = settings.language.as_str(),
        "Generated diary"
    );

    Ok(Json(DiaryDetail {
        diary,
        timeline_events: timeline,
        photos,
    }))
}

/// POST /api/diary/thumb
pub async fn thumb(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    ApiJson(request): ApiJson<ThumbRequest>,
) -> Result<Json<DbDiary>> {
    let diary_id = parse_uuid(&request.diary_id, "diary_id")?;
    let event_id = parse_uuid(&request.event_id, "event_id")?;

    let diary = state
        .db
        .set_thumb_event(&auth.user_id, diary_id, event_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Diary or timeline event not found".to_string()))?;

    Ok(Json(diary))
}

/// GET /api/diary/history
pub async fn history(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    ApiQuery(query): ApiQuery<HistoryQuery>,
) -> Result<Json<Vec<DiaryHistoryItem>>> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    if !(1..=MAX_HISTORY_LIMIT).contains(&limit) {
        return Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {MAX_HISTORY_LIMIT}"
        )));
    }

    let diaries = state.db.get_diary_history(&auth.user_id, limit).await?;
    Ok(Json(diaries))
}

/// GET /api/diary/draft
pub async fn draft(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    ApiQuery(query): ApiQuery<DateQuery>,
) -> Result<Json<DbDiary>> {
    let date = parse_date(&query.date)?;
    let diary = state.db.get_or_create_diary(&auth.user_id, date).await?;

    Ok(Json(diary))
}

/// GET /api/diary/{id}
pub async fn get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<DiaryDetail>> {
    let diary_id = parse_uuid(&id, "diary id")?;
    let diary = require_diary(&state, &auth.user_id, diary_id).await?;

    let timeline_events = state.db.get_active_timeline(&auth.user_id, diary_id).await?;
    let photos = state.db.get_photos(&auth.user_id, diary_id).await?;

    Ok(Json(DiaryDetail {
        diary,
        timeline_events,
        photos,
    }))
}

/// DELETE /api/diary/{id}
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>> {
    let diary_id = parse_uuid(&id, "diary id")?;

    if !state.db.delete_diary(&auth.user_id, diary_id).await? {
        return Err(ApiError::NotFound("Diary not found".to_string()));
    }
    tracing::info!(diary_id = %diary_id, "Deleted diary");

    Ok(Json(OkResponse::ok()))
}
