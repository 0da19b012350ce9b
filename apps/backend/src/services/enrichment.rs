//! Best-effort AI enrichment: emojis, photo analysis and diary text.
//!
//! Emoji and photo analysis never fail the request; a model error is
//! logged and replaced by a fixed fallback. Diary generation is the
//! primary result of its endpoint, so its errors propagate.

use std::sync::Arc;

use axum::body::Bytes;
use futures::future::join_all;

use dayflow_core::diary::{
    diary_system_prompt, diary_user_prompt, parse_generated_diary, DiaryPromptEntry,
};
use dayflow_core::emoji::{emoji_prompt, fallback_emojis, parse_emoji_response};
use dayflow_core::exif_time::capture_time;
use dayflow_core::photo::{analysis_prompt, fallback_photo_event, resolve_photo_event};
use dayflow_core::spending::total_spending;
use dayflow_core::{DiarySettings, GeneratedDiary, PhotoEvent};

use crate::models::DbTimelineEvent;
use crate::services::llm::{ChatMessage, LanguageModel, LlmError};

/// One uploaded image awaiting analysis
#[derive(Debug, Clone)]
pub struct PhotoInput {
    pub filename: String,
    pub mime: String,
    pub bytes: Bytes,
}

/// One emoji per title, in order. Single attempt; falls back to defaults.
pub async fn assign_emojis(llm: &dyn LanguageModel, titles: &[String]) -> Vec<String> {
    if titles.is_empty() {
        return Vec::new();
    }

    let reply = llm
        .complete(vec![ChatMessage::user(emoji_prompt(titles))])
        .await;

    match reply {
        Ok(text) => match parse_emoji_response(&text, titles.len()) {
            Ok(emojis) => emojis,
            Err(e) => {
                tracing::warn!(error = %e, "Unusable emoji response, using defaults");
                fallback_emojis(titles.len())
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "Emoji assignment failed, using defaults");
            fallback_emojis(titles.len())
        }
    }
}

/// Analyse one photo. EXIF capture time wins over the model's estimate.
pub async fn analyze_photo(llm: &dyn LanguageModel, photo: &PhotoInput) -> PhotoEvent {
    analyze_captured(llm, photo, capture_time(&photo.bytes)).await
}

async fn analyze_captured(
    llm: &dyn LanguageModel,
    photo: &PhotoInput,
    captured: Option<String>,
) -> PhotoEvent {
    let prompt = analysis_prompt(captured.is_some());
    let message = ChatMessage::user_with_image(prompt, &photo.bytes, &photo.mime);

    match llm.complete(vec![message]).await {
        Ok(text) => resolve_photo_event(&text, &photo.filename, captured.as_deref()),
        Err(e) => {
            tracing::warn!(file = %photo.filename, error = %e, "Photo analysis failed");
            fallback_photo_event(&photo.filename, &e.to_string(), captured.as_deref())
        }
    }
}

/// Analyse photos concurrently; each failure becomes that photo's placeholder.
pub async fn analyze_photos(llm: Arc<dyn LanguageModel>, photos: Vec<PhotoInput>) -> Vec<PhotoEvent> {
    // Read outside the task so a crashed analysis keeps the capture time
    let captured: Vec<(String, Option<String>)> = photos
        .iter()
        .map(|p| (p.filename.clone(), capture_time(&p.bytes)))
        .collect();

    let handles: Vec<_> = photos
        .into_iter()
        .zip(captured.iter().map(|(_, time)| time.clone()))
        .map(|(photo, time)| {
            let llm = Arc::clone(&llm);
            tokio::spawn(async move { analyze_captured(llm.as_ref(), &photo, time).await })
        })
        .collect();

    join_all(handles)
        .await
        .into_iter()
        .zip(captured)
        .map(|(result, (filename, time))| {
            result.unwrap_or_else(|e| {
                tracing::error!(file = %filename, error = %e, "Photo analysis task failed");
                fallback_photo_event(&filename, "analysis task failed", time.as_deref())
            })
        })
        .collect()
}

/// Write the diary for a day's active timeline.
pub async fn generate_diary(
    llm: &dyn LanguageModel,
    settings: &DiarySettings,
    timeline: &[DbTimelineEvent],
) -> Result<GeneratedDiary, LlmError> {
    let total = total_spending(timeline.iter().map(|e| e.spending));
    let entries: Vec<DiaryPromptEntry> = timeline
        .iter()
        .map(|e| DiaryPromptEntry {
            time: e.time.clone(),
            emoji: e.emoji.clone(),
            title: e.title.clone(),
            description: e.description.clone(),
            location: e.location.clone(),
            spending: e.spending,
        })
        .collect();

    let text = llm
        .complete(vec![
            ChatMessage::system(diary_system_prompt(settings)),
            ChatMessage::user(diary_user_prompt(&entries, total)),
        ])
        .await?;

    Ok(parse_generated_diary(&text, total))
}
