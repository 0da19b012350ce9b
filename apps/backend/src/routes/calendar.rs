//! Calendar import endpoints

use axum::{
    extract::State,
    Extension, Json,
};
use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::routes::auth::AuthenticatedUser;
use crate::routes::extract::{ApiJson, ApiQuery};
use crate::routes::diary::require_diary;
use crate::routes::google::{fresh_token, google_client};
use crate::routes::{parse_date, parse_uuid, reject_nul};
use crate::services::enrichment;
use crate::services::google::calendar_id_from_setting;
use crate::AppState;

/// Fill missing emojis, resolve the target diary, then store and bridge.
async fn import_events(
    state: &AppState,
    user_id: &str,
    date: NaiveDate,
    diary_id: Option<Uuid>,
    mut events: Vec<CalendarEventInput>,
) -> Result<CalendarImportResponse> {
    let missing: Vec<usize> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| e.emoji.as_deref().map_or(true, |s| s.trim().is_empty()))
        .map(|(i, _)| i)
        .collect();
    if !missing.is_empty() {
        let titles: Vec<String> = missing.iter().map(|&i| events[i].title.clone()).collect();
        let emojis = enrichment::assign_emojis(state.llm.as_ref(), &titles).await;
        for (i, emoji) in missing.into_iter().zip(emojis) {
            events[i].emoji = Some(emoji);
        }
    }

    let diary = match diary_id {
        Some(id) => {
            let diary = require_diary(state, user_id, id).await?;
            if diary.date != date {
                return Err(ApiError::BadRequest(format!(
                    "Diary {id} belongs to {}, not {date}",
                    diary.date
                )));
            }
            diary
        }
        None => state.db.get_or_create_diary(user_id, date).await?,
    };

    let (rows, inserted) = state
        .db
        .import_calendar_events(user_id, date, diary.id, &events)
        .await?;

    tracing::info!(
        date = %date,
        diary_id = %diary.id,
        saved = rows.len(),
        timeline_inserted = inserted.len(),
        "Imported calendar events"
    );

    Ok(CalendarImportResponse {
        saved: rows.len(),
        events: rows,
        diary_id: diary.id,
        timeline_inserted: inserted.len(),
    })
}

/// POST /api/calendar/events
pub async fn save(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    ApiJson(request): ApiJson<SaveCalendarRequest>,
) -> Result<Json<CalendarImportResponse>> {
    let date = parse_date(&request.date)?;
    for event in &request.events {
        reject_nul([
            ("title", Some(event.title.as_str())),
            ("description", event.description.as_deref()),
            ("start_time", Some(event.start_time.as_str())),
            ("end_time", event.end_time.as_deref()),
            ("location", event.location.as_deref()),
            ("calendar_id", event.calendar_id.as_deref()),
            ("emoji", event.emoji.as_deref()),
        ])?;
    }
    let diary_id = request
        .diary_id
        .as_deref()
        .map(|id| parse_uuid(id, "diary_id"))
        .transpose()?;

    let response = import_events(&state, &auth.user_id, date, diary_id, request.events).await?;
    Ok(Json(response))
}

/// GET /api/calendar/events
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    ApiQuery(query): ApiQuery<DateQuery>,
) -> Result<Json<CalendarEventsResponse>> {
    let date = parse_date(&query.date)?;
    let events = state.db.get_calendar_events(&auth.user_id, date).await?;

    Ok(Json(CalendarEventsResponse { date, events }))
}

/// DELETE /api/calendar/events
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    ApiQuery(query): ApiQuery<DateQuery>,
) -> Result<Json<OkResponse>> {
    let date = parse_date(&query.date)?;
    let removed = state.db.delete_calendar_events(&auth.user_id, date).await?;
    tracing::info!(date = %date, removed, "Deleted calendar events");

    Ok(Json(OkResponse::ok()))
}

/// GET /api/calendar/fetch
///
/// Pulls the day's events from Google Calendar and imports them.
pub async fn fetch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    ApiQuery(query): ApiQuery<DateQuery>,
) -> Result<Json<CalendarImportResponse>> {
    let date = parse_date(&query.date)?;
    let client = google_client(&state)?.clone();

    let token = fresh_token(&state, &client, &auth.user_id).await?;
    let calendar_url = state
        .db
        .get_user(&auth.user_id)
        .await?
        .and_then(|user| user.calendar_url);
    let calendar_id = calendar_id_from_setting(calendar_url.as_deref());

    let events = client.list_events(&token, &calendar_id, date).await?;
    let response = import_events(&state, &auth.user_id, date, None, events).await?;

    Ok(Json(response))
}
