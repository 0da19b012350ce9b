//! Core timeline policies shared by the Dayflow backend.
//!
//! Provides:
//! - Spending normalization (fractional input, integer storage)
//! - Time-of-day parsing for calendar and photo sources
//! - Calendar-to-timeline bridge planning with provider-id dedup
//! - Photo time resolution (EXIF capture time over AI estimate)
//! - Emoji assignment prompts and strict response parsing
//! - Diary generation prompts and response parsing
//!
//! Nothing in this crate performs I/O.

pub mod bridge;
pub mod clock;
pub mod diary;
pub mod emoji;
pub mod error;
pub mod exif_time;
pub mod llm_text;
pub mod photo;
pub mod spending;
pub mod types;

pub use bridge::plan_calendar_bridge;
pub use clock::{normalize_hhmm, time_from_iso, DEFAULT_TIME};
pub use error::{ParseError, Result};
pub use spending::normalize_spending;
pub use types::{
    CalendarEventInput, DiaryLanguage, DiarySettings, DiaryStyle, GeneratedDiary, PhotoEvent,
    SourceKind, TimeSource, TimelineEntryDraft,
};
