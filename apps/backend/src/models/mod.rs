//! Database models and API types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use dayflow_core::{
    normalize_hhmm, normalize_spending, ParseError, SourceKind, TimeSource, TimelineEntryDraft,
};

// Re-export shared types from dayflow-core
pub use dayflow_core::{CalendarEventInput, DiarySettings, GeneratedDiary, PhotoEvent};

// === Database Entity Types ===

/// User profile row. One row per external identity.
#[derive(Debug, Clone, FromRow)]
pub struct DbUser {
    pub user_id: String,
    pub name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub calendar_url: Option<String>,
    pub profile_image: Option<String>,
    pub google_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

/// Diary row, one per (user, date)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbDiary {
    pub id: Uuid,
    pub user_id: String,
    pub date: NaiveDate,
    pub diary_text: Option<String>,
    pub spending_insight: Option<String>,
    pub tomorrow_suggestion: Option<String>,
    pub total_spending: i64,
    pub thumb_event_id: Option<Uuid>,
    pub diary_preview: Option<String>,
    pub primary_emoji: Option<String>,
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Timeline entry row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbTimelineEvent {
    pub id: Uuid,
    pub diary_id: Uuid,
    pub time: String,
    pub emoji: String,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub spending: i64,
    pub category: Option<String>,
    pub source: String,
    pub source_id: Option<String>,
    pub is_deleted: bool,
    pub photo_url: Option<String>,
    pub ai_analysis: Option<String>,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Photo row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbPhoto {
    pub id: Uuid,
    pub diary_id: Uuid,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub ai_analysis: Option<String>,
    pub extracted_time: Option<String>,
    pub extracted_location: Option<String>,
    pub time_source: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Imported calendar event row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbCalendarEvent {
    pub id: Uuid,
    pub user_id: String,
    pub date: NaiveDate,
    pub diary_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub start_time: String,
    pub end_time: Option<String>,
    pub location: Option<String>,
    pub all_day: bool,
    pub calendar_id: Option<String>,
    pub emoji: Option<String>,
    pub created_at: DateTime<Utc>,
}

// === Write Types ===

/// Diary fields written by a save, already normalized
#[derive(Debug, Clone, Default)]
pub struct DiaryWrite {
    pub diary_text: Option<String>,
    pub spending_insight: Option<String>,
    pub tomorrow_suggestion: Option<String>,
    pub total_spending: i64,
    pub thumb_event_id: Option<Uuid>,
    pub diary_preview: Option<String>,
    pub primary_emoji: Option<String>,
    pub photo_url: Option<String>,
}

/// Photo row to insert
#[derive(Debug, Clone)]
pub struct NewPhoto {
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub ai_analysis: Option<String>,
    pub extracted_time: Option<String>,
    pub extracted_location: Option<String>,
    pub time_source: Option<TimeSource>,
}

// === API Request/Response Types ===

/// User profile as returned by the API. The OAuth token never leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub calendar_url: Option<String>,
    pub profile_image: Option<String>,
    pub google_connected: bool,
    pub created_at: DateTime<Utc>,
}

impl From<DbUser> for UserProfile {
    fn from(user: DbUser) -> Self {
        Self {
            google_connected: user.google_token.is_some(),
            user_id: user.user_id,
            name: user.name,
            age: user.age,
            gender: user.gender,
            calendar_url: user.calendar_url,
            profile_image: user.profile_image,
            created_at: user.created_at,
        }
    }
}

/// Profile update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub calendar_url: Option<String>,
    pub profile_image: Option<String>,
}

/// Timeline entry as submitted by a client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEventInput {
    pub time: String,
    #[serde(default)]
    pub emoji: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub spending: f64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

impl TimelineEventInput {
    pub fn text_fields(&self) -> [(&'static str, Option<&str>); 6] {
        [
            ("time", Some(self.time.as_str())),
            ("emoji", self.emoji.as_deref()),
            ("title", Some(self.title.as_str())),
            ("description", self.description.as_deref()),
            ("location", self.location.as_deref()),
            ("category", self.category.as_deref()),
        ]
    }

    /// Validate and normalize into an insertable entry.
    pub fn into_draft(self, sort_order: i32) -> Result<TimelineEntryDraft, ParseError> {
        let time = normalize_hhmm(&self.time).ok_or_else(|| ParseError::InvalidTime {
            value: self.time.clone(),
        })?;
        let source = match self.source.as_deref() {
            Some(value) => SourceKind::parse(value)?,
            None => SourceKind::Manual,
        };

        Ok(TimelineEntryDraft {
            time,
            emoji: self.emoji.unwrap_or_default(),
            title: self.title,
            description: self.description,
            location: self.location,
            spending: normalize_spending(self.spending),
            category: self.category,
            source,
            source_id: None,
            photo_url: None,
            ai_analysis: None,
            sort_order,
        })
    }
}

/// Diary body of a save request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiaryInput {
    pub id: Option<String>,
    pub diary_text: Option<String>,
    pub spending_insight: Option<String>,
    pub tomorrow_suggestion: Option<String>,
    pub total_spending: f64,
    pub thumb_event_id: Option<String>,
    pub diary_preview: Option<String>,
    pub primary_emoji: Option<String>,
    pub photo_url: Option<String>,
    pub timeline: Vec<TimelineEventInput>,
}

impl DiaryInput {
    pub fn text_fields(&self) -> [(&'static str, Option<&str>); 6] {
        [
            ("diary_text", self.diary_text.as_deref()),
            ("spending_insight", self.spending_insight.as_deref()),
            ("tomorrow_suggestion", self.tomorrow_suggestion.as_deref()),
            ("diary_preview", self.diary_preview.as_deref()),
            ("primary_emoji", self.primary_emoji.as_deref()),
            ("photo_url", self.photo_url.as_deref()),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveDiaryRequest {
    pub date: String,
    pub diary: DiaryInput,
}

/// Saved diary plus the entries inserted with it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveDiaryResponse {
    #[serde(flatten)]
    pub diary: DbDiary,
    pub timeline_events: Vec<DbTimelineEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateDiaryRequest {
    pub diary_id: String,
    /// Falls back to the user's stored settings when absent.
    #[serde(default)]
    pub settings: Option<DiarySettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveSettingsResponse {
    pub success: bool,
    pub settings: DiarySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThumbRequest {
    pub diary_id: String,
    pub event_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DateQuery {
    pub date: String,
}

/// Optional date for photo uploads; empty means "analyse only"
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OptionalDateQuery {
    #[serde(default)]
    pub date: Option<String>,
}

/// Diary with its active timeline and photos
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiaryDetail {
    #[serde(flatten)]
    pub diary: DbDiary,
    pub timeline_events: Vec<DbTimelineEvent>,
    pub photos: Vec<DbPhoto>,
}

/// History entry: a diary with its active timeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiaryHistoryItem {
    #[serde(flatten)]
    pub diary: DbDiary,
    pub timeline_events: Vec<DbTimelineEvent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimelineQuery {
    pub diary_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineResponse {
    pub timeline: Vec<DbTimelineEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddEventRequest {
    pub diary_id: String,
    pub event: TimelineEventInput,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventResponse {
    pub event: DbTimelineEvent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSpendingRequest {
    pub event_id: String,
    pub spending: f64,
}

/// Photo record as submitted for bulk save
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub url: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub ai_analysis: Option<String>,
    #[serde(default)]
    pub extracted_time: Option<String>,
    #[serde(default)]
    pub extracted_location: Option<String>,
    #[serde(default)]
    pub time_source: Option<TimeSource>,
}

impl From<PhotoRecord> for NewPhoto {
    fn from(record: PhotoRecord) -> Self {
        Self {
            url: record.url,
            thumbnail_url: record.thumbnail_url,
            ai_analysis: record.ai_analysis,
            extracted_time: record.extracted_time,
            extracted_location: record.extracted_location,
            time_source: record.time_source,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavePhotosRequest {
    pub diary_id: String,
    pub photos: Vec<PhotoRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavePhotosResponse {
    pub saved: usize,
    pub photos: Vec<DbPhoto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotosResponse {
    pub photos: Vec<DbPhoto>,
}

/// Storage outcome for one uploaded file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedPhoto {
    pub url: Option<String>,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoUploadResponse {
    pub photos: Vec<UploadedPhoto>,
    pub events: Vec<PhotoEvent>,
    pub diary_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoAnalyzeResponse {
    pub events: Vec<PhotoEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveCalendarRequest {
    pub date: String,
    pub events: Vec<CalendarEventInput>,
    #[serde(default)]
    pub diary_id: Option<String>,
}

/// Result of a calendar import for one date
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarImportResponse {
    pub saved: usize,
    pub events: Vec<DbCalendarEvent>,
    pub diary_id: Uuid,
    pub timeline_inserted: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEventsResponse {
    pub date: NaiveDate,
    pub events: Vec<DbCalendarEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleStatusResponse {
    pub configured: bool,
    pub connected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleLoginResponse {
    pub auth_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}
