//! Photo time resolution.
//!
//! A photo entry's time comes from one of two places: the capture time
//! embedded in the image, or the model's guess from the image content.
//! An embedded capture time is authoritative; when it is present the model
//! is not asked to estimate a time at all.

use serde::Deserialize;

use crate::clock::{normalize_hhmm, DEFAULT_TIME};
use crate::emoji::PHOTO_EMOJI;
use crate::llm_text::{parse_json, strip_code_fences};
use crate::types::{PhotoEvent, SourceKind, TimeSource};

const DEFAULT_TITLE: &str = "Photo";

const PROMPT_WITH_TIME: &str = "\
Analyze this photo from someone's day and return a JSON object with these fields:
- \"time\": estimated time of day in HH:MM format (24h). Guess from lighting/context.
- \"title\": short 3-6 word description of the activity (e.g. \"Latte art photo\", \"Lunch at noodle bar\")
- \"emoji\": single emoji that best represents this moment
- \"description\": 1-2 sentence description of what's in the photo

Return ONLY the JSON object, no markdown or extra text. Example:
{\"time\": \"09:15\", \"title\": \"Morning coffee ritual\", \"emoji\": \"☕\", \"description\": \"A latte with beautiful art at a cozy cafe.\"}
";

const PROMPT_WITHOUT_TIME: &str = "\
Analyze this photo from someone's day and return a JSON object with these fields:
- \"title\": short 3-6 word description of the activity (e.g. \"Latte art photo\", \"Lunch at noodle bar\")
- \"emoji\": single emoji that best represents this moment
- \"description\": 1-2 sentence description of what's in the photo

Return ONLY the JSON object, no markdown or extra text. Example:
{\"title\": \"Morning coffee ritual\", \"emoji\": \"☕\", \"description\": \"A latte with beautiful art at a cozy cafe.\"}
";

/// Vision prompt for a photo, depending on whether its capture time is known.
pub fn analysis_prompt(has_capture_time: bool) -> &'static str {
    if has_capture_time {
        PROMPT_WITHOUT_TIME
    } else {
        PROMPT_WITH_TIME
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAnalysis {
    time: Option<String>,
    title: Option<String>,
    emoji: Option<String>,
    description: Option<String>,
}

/// Turn the model's answer into a photo event, applying the time policy.
///
/// Text that is not a JSON object is kept as the description, with the
/// file name as title.
pub fn resolve_photo_event(
    ai_text: &str,
    filename: &str,
    capture_time: Option<&str>,
) -> PhotoEvent {
    let (raw, title_fallback) = match parse_json::<RawAnalysis>(ai_text) {
        Ok(raw) => (raw, DEFAULT_TITLE),
        Err(_) => (
            RawAnalysis {
                description: Some(strip_code_fences(ai_text).to_string()),
                ..Default::default()
            },
            display_name(filename),
        ),
    };

    let (time, time_source) = resolve_time(capture_time, raw.time.as_deref());

    PhotoEvent {
        time,
        time_source,
        title: non_blank(raw.title).unwrap_or_else(|| title_fallback.to_string()),
        emoji: non_blank(raw.emoji).unwrap_or_else(|| PHOTO_EMOJI.to_string()),
        description: raw.description.unwrap_or_default(),
        source: SourceKind::Photo,
        photo_url: None,
    }
}

/// Placeholder event for a photo whose analysis failed outright.
pub fn fallback_photo_event(filename: &str, reason: &str, capture_time: Option<&str>) -> PhotoEvent {
    let (time, time_source) = resolve_time(capture_time, None);
    PhotoEvent {
        time,
        time_source,
        title: display_name(filename).to_string(),
        emoji: PHOTO_EMOJI.to_string(),
        description: reason.to_string(),
        source: SourceKind::Photo,
        photo_url: None,
    }
}

/// Pick the displayed time: capture time first, then the model's guess.
pub fn resolve_time(capture_time: Option<&str>, ai_time: Option<&str>) -> (String, TimeSource) {
    if let Some(time) = capture_time.and_then(normalize_hhmm) {
        return (time, TimeSource::Exif);
    }
    let time = ai_time
        .and_then(normalize_hhmm)
        .unwrap_or_else(|| DEFAULT_TIME.to_string());
    (time, TimeSource::Ai)
}

fn display_name(filename: &str) -> &str {
    let trimmed = filename.trim();
    if trimmed.is_empty() {
        DEFAULT_TITLE
    } else {
        trimmed
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
