//! Diary generation prompts and response handling.

use serde::{Deserialize, Serialize};

use crate::llm_text::parse_json;
use crate::types::{DiaryLanguage, DiarySettings, DiaryStyle, GeneratedDiary};

/// Characters kept in a diary's preview text.
pub const PREVIEW_CHARS: usize = 80;

/// One timeline line as shown to the model.
#[derive(Debug, Clone, Serialize)]
pub struct DiaryPromptEntry {
    pub time: String,
    pub emoji: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub spending: i64,
}

fn style_instructions(style: DiaryStyle) -> &'static str {
    match style {
        DiaryStyle::Summary => {
            "You are a concise diary writer producing a clean, organized summary of the day.\n\
             - Short, clear sentences\n\
             - Group events by morning, afternoon and evening\n\
             - Facts over emotion\n\
             - Under 150 words: brief intro, key events, wrap-up"
        }
        DiaryStyle::Friendly => {
            "You are the user's close friend retelling their day.\n\
             - Casual, warm tone with contractions\n\
             - Small personal reactions to what happened\n\
             - Mention concrete details from the timeline\n\
             - 150-200 words, like a cozy catch-up"
        }
        DiaryStyle::Emotional => {
            "You are a reflective diary writer who captures how the day felt.\n\
             - Focus on moods and inner thoughts\n\
             - Tie events to feelings and sensory details\n\
             - Find meaning in small moments\n\
             - 150-200 words ending with a personal reflection"
        }
        DiaryStyle::Poetic => {
            "You are a literary diary writer turning an ordinary day into prose.\n\
             - Metaphor and vivid imagery\n\
             - Rhythmic, lyrical sentences\n\
             - Rich vocabulary without pretension\n\
             - 150-200 words, like a short personal essay"
        }
        DiaryStyle::Humorous => {
            "You are a witty diary writer who finds the funny side of the day.\n\
             - Light, self-deprecating humor\n\
             - Playful observations and gentle sarcasm\n\
             - 150-200 words, fun but not forced"
        }
    }
}

/// System prompt for diary generation.
pub fn diary_system_prompt(settings: &DiarySettings) -> String {
    let mut prompt = String::from(style_instructions(settings.style));

    prompt.push_str(match settings.language {
        DiaryLanguage::En => "\n\nWrite in English.",
        DiaryLanguage::Auto => {
            "\n\nWrite in the same language as the user's timeline. \
             If the events are in English, write in English; if in Korean, write in Korean."
        }
    });

    if settings.include_spending {
        prompt.push_str("\n\nInclude a gentle spending insight based on the spending data provided.");
    } else {
        prompt.push_str("\n\nDo NOT mention money or spending in the diary text.");
    }

    if settings.include_suggestion {
        prompt.push_str("\n\nInclude a positive suggestion for tomorrow.");
    }

    let custom = settings.custom_prompt.trim();
    if !custom.is_empty() {
        prompt.push_str(&format!("\n\nUser's additional instruction: \"{custom}\""));
    }

    prompt.push_str(
        "\n\nYour final response must be ONLY a JSON object (no markdown, no explanation):\n\
         {\n  \"diary_text\": \"The diary entry text\",\n  \
         \"spending_insight\": \"One sentence about spending (or empty string if disabled)\",\n  \
         \"tomorrow_suggestion\": \"One positive tip for tomorrow (or empty string if disabled)\",\n  \
         \"total_spending\": <total as integer>\n}",
    );

    prompt
}

/// User prompt carrying the day's timeline.
pub fn diary_user_prompt(entries: &[DiaryPromptEntry], total_spending: i64) -> String {
    let timeline = serde_json::to_string_pretty(entries).unwrap_or_else(|_| "[]".to_string());
    format!("Here is my timeline for today:\n{timeline}\n\nTotal spending: {total_spending}")
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDiary {
    diary_text: Option<String>,
    spending_insight: Option<String>,
    tomorrow_suggestion: Option<String>,
}

/// Interpret the model's diary answer.
///
/// A JSON object is read field by field; anything else becomes the diary
/// text verbatim. The total always comes from the stored entries, never
/// from the model.
pub fn parse_generated_diary(text: &str, total_spending: i64) -> GeneratedDiary {
    match parse_json::<RawDiary>(text) {
        Ok(raw) => GeneratedDiary {
            diary_text: raw.diary_text.unwrap_or_default(),
            spending_insight: raw.spending_insight.unwrap_or_default(),
            tomorrow_suggestion: raw.tomorrow_suggestion.unwrap_or_default(),
            total_spending,
        },
        Err(_) => GeneratedDiary {
            diary_text: text.trim().to_string(),
            spending_insight: String::new(),
            tomorrow_suggestion: String::new(),
            total_spending,
        },
    }
}

/// First `max_chars` characters of the diary text, with an ellipsis if cut.
pub fn preview_text(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    let mut preview: String = collapsed.chars().take(max_chars).collect();
    preview.push('…');
    preview
}

/// Representative emoji for a day: the highest-spending entry, else the first.
pub fn primary_emoji<'a, I>(entries: I) -> Option<String>
where
    I: IntoIterator<Item = (&'a str, i64)>,
{
    let mut first: Option<&str> = None;
    let mut top: Option<(&str, i64)> = None;

    for (emoji, spending) in entries {
        if emoji.trim().is_empty() {
            continue;
        }
        first.get_or_insert(emoji);
        if spending > 0 && top.map_or(true, |(_, best)| spending > best) {
            top = Some((emoji, spending));
        }
    }

    top.map(|(emoji, _)| emoji).or(first).map(str::to_string)
}
