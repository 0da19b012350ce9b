//! Core types for the Dayflow timeline.

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Where a timeline entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[default]
    Manual,
    Calendar,
    Photo,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Calendar => "calendar",
            Self::Photo => "photo",
        }
    }

    /// Parse a stored or submitted source name.
    ///
    /// `chat` is accepted as an alias of `manual`, since entries typed into
    /// the chat prompt are user-authored.
    pub fn parse(value: &str) -> Result<Self, ParseError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "manual" | "chat" | "" => Ok(Self::Manual),
            "calendar" => Ok(Self::Calendar),
            "photo" => Ok(Self::Photo),
            _ => Err(ParseError::UnknownSource {
                value: value.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which source supplied a photo entry's displayed time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeSource {
    Exif,
    Ai,
}

impl TimeSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exif => "exif",
            Self::Ai => "ai",
        }
    }
}

/// A calendar event as imported from the provider or submitted by a client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalendarEventInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// ISO 8601 start, or a bare `YYYY-MM-DD` for all-day events.
    pub start_time: String,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub all_day: bool,
    /// Provider event id, used as the dedup key.
    #[serde(default)]
    pub calendar_id: Option<String>,
    #[serde(default)]
    pub emoji: Option<String>,
}

impl CalendarEventInput {
    /// Provider id, if present and non-blank.
    pub fn provider_id(&self) -> Option<&str> {
        self.calendar_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// A timeline entry ready to be persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntryDraft {
    pub time: String,
    pub emoji: String,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub spending: i64,
    pub category: Option<String>,
    pub source: SourceKind,
    pub source_id: Option<String>,
    pub photo_url: Option<String>,
    pub ai_analysis: Option<String>,
    pub sort_order: i32,
}

/// Result of analysing one photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoEvent {
    pub time: String,
    pub time_source: TimeSource,
    pub title: String,
    pub emoji: String,
    pub description: String,
    pub source: SourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

/// Writing style for generated diaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DiaryStyle {
    Summary,
    #[default]
    Friendly,
    Emotional,
    Poetic,
    Humorous,
}

impl DiaryStyle {
    pub const ALL: [DiaryStyle; 5] = [
        Self::Summary,
        Self::Friendly,
        Self::Emotional,
        Self::Poetic,
        Self::Humorous,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Friendly => "friendly",
            Self::Emotional => "emotional",
            Self::Poetic => "poetic",
            Self::Humorous => "humorous",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ParseError> {
        Self::ALL
            .into_iter()
            .find(|s| s.as_str() == value.trim().to_ascii_lowercase())
            .ok_or_else(|| ParseError::UnknownStyle {
                value: value.to_string(),
            })
    }
}

/// Output language for generated diaries.
///
/// `Auto` follows the language of the timeline entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DiaryLanguage {
    #[default]
    En,
    Auto,
}

impl DiaryLanguage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Auto => "auto",
        }
    }
}

/// Options controlling diary generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiarySettings {
    pub style: DiaryStyle,
    pub language: DiaryLanguage,
    pub include_spending: bool,
    pub include_suggestion: bool,
    pub custom_prompt: String,
}

impl Default for DiarySettings {
    fn default() -> Self {
        Self {
            style: DiaryStyle::Friendly,
            language: DiaryLanguage::En,
            include_spending: true,
            include_suggestion: true,
            custom_prompt: String::new(),
        }
    }
}

/// Diary text produced by the language model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedDiary {
    pub diary_text: String,
    pub spending_insight: String,
    pub tomorrow_suggestion: String,
    pub total_spending: i64,
}
