//! Emoji assignment for timeline entries.
//!
//! Titles are sent to the model in one batch and the answer must be a JSON
//! array matched to the input by position. Any deviation is treated as a
//! failure and the caller falls back to [`fallback_emojis`].

use crate::error::{ParseError, Result};
use crate::llm_text::parse_json;

/// Emoji used for calendar entries and whenever assignment fails.
pub const DEFAULT_EMOJI: &str = "📅";

/// Emoji used for photo entries the model could not describe.
pub const PHOTO_EMOJI: &str = "📸";

/// Placeholder emojis clients send when the user did not pick one.
pub const GENERIC_EMOJIS: [&str; 3] = ["📌", "📅", "📝"];

/// Whether an entry should get a model-assigned emoji.
pub fn needs_emoji(emoji: Option<&str>) -> bool {
    match emoji.map(str::trim) {
        None | Some("") => true,
        Some(e) => GENERIC_EMOJIS.contains(&e),
    }
}

/// Build the batch prompt for a list of titles.
pub fn emoji_prompt(titles: &[String]) -> String {
    let events = serde_json::to_string(titles).unwrap_or_else(|_| "[]".to_string());
    format!(
        "Given these calendar events, assign a single emoji to each that best represents the activity.\n\
         Return ONLY a JSON array of emojis in the same order. No markdown, no explanation.\n\
         \n\
         Events:\n\
         {events}\n\
         \n\
         Example input: [\"Team standup\", \"Lunch at cafe\", \"Gym session\"]\n\
         Example output: [\"💻\", \"🍽️\", \"🏋️\"]\n"
    )
}

/// Parse the model's answer, requiring exactly `expected` non-blank emojis.
pub fn parse_emoji_response(text: &str, expected: usize) -> Result<Vec<String>> {
    let emojis: Vec<String> = parse_json(text)?;
    if emojis.len() != expected {
        return Err(ParseError::LengthMismatch {
            expected,
            actual: emojis.len(),
        });
    }
    if emojis.iter().any(|e| e.trim().is_empty()) {
        return Err(ParseError::InvalidJson("blank emoji in response".to_string()));
    }
    Ok(emojis.into_iter().map(|e| e.trim().to_string()).collect())
}

/// One default emoji per input item.
pub fn fallback_emojis(count: usize) -> Vec<String> {
    vec![DEFAULT_EMOJI.to_string(); count]
}
