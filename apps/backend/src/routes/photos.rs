//! Photo upload and analysis endpoints

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    Extension, Json,
};

use futures::future::join_all;

use dayflow_core::{SourceKind, TimelineEntryDraft};

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::routes::auth::AuthenticatedUser;
use crate::routes::extract::{ApiJson, ApiMultipart, ApiQuery};
use crate::routes::diary::require_diary;
use crate::routes::{parse_date, parse_uuid};
use crate::services::enrichment::{self, PhotoInput};
use crate::services::storage::PhotoStore;
use crate::AppState;

pub const MAX_UPLOAD_PHOTOS: usize = 10;
pub const MAX_ANALYZE_PHOTOS: usize = 5;

const DEFAULT_MIME: &str = "image/jpeg";

/// Collect the file parts of a multipart body, at most `max` of them.
async fn read_photos(mut multipart: Multipart, max: usize) -> Result<Vec<PhotoInput>> {
    let mut photos = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        // Plain form fields carry no file name
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        if photos.len() == max {
            return Err(ApiError::BadRequest(format!("Maximum {max} images allowed")));
        }

        let mime = field.content_type().unwrap_or(DEFAULT_MIME).to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;

        photos.push(PhotoInput {
            filename,
            mime,
            bytes,
        });
    }

    if photos.is_empty() {
        return Err(ApiError::BadRequest("No images uploaded".to_string()));
    }
    Ok(photos)
}

/// Store every photo concurrently; a failed upload is reported on its item.
pub(crate) async fn upload_photos(
    store: &dyn PhotoStore,
    user_id: &str,
    photos: &[PhotoInput],
) -> Vec<UploadedPhoto> {
    let uploads = photos.iter().map(|photo| async move {
        match store
            .upload_photo(user_id, &photo.filename, &photo.bytes, &photo.mime)
            .await
        {
            Ok(url) => UploadedPhoto {
                url: Some(url),
                filename: photo.filename.clone(),
                error: None,
            },
            Err(e) => {
                tracing::warn!(file = %photo.filename, error = %e, "Photo upload failed");
                UploadedPhoto {
                    url: None,
                    filename: photo.filename.clone(),
                    error: Some(e.to_string()),
                }
            }
        }
    });

    join_all(uploads).await
}

fn photo_records(
    event: &PhotoEvent,
    url: String,
    sort_order: i32,
) -> (NewPhoto, TimelineEntryDraft) {
    let photo = NewPhoto {
        url: url.clone(),
        thumbnail_url: None,
        ai_analysis: Some(event.description.clone()),
        extracted_time: Some(event.time.clone()),
        extracted_location: None,
        time_source: Some(event.time_source),
    };
    let entry = TimelineEntryDraft {
        time: event.time.clone(),
        emoji: event.emoji.clone(),
        title: event.title.clone(),
        description: Some(event.description.clone()),
        location: None,
        spending: 0,
        category: None,
        source: SourceKind::Photo,
        source_id: None,
        photo_url: Some(url),
        ai_analysis: Some(event.description.clone()),
        sort_order,
    };
    (photo, entry)
}

/// POST /api/photos/upload
///
/// Uploads and analyses photos. With a `date`, each stored photo is also
/// saved with a linked timeline entry in that day's diary. Each photo
/// succeeds or fails on its own; failures are reported in `photos[].error`.
pub async fn upload(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    ApiQuery(query): ApiQuery<OptionalDateQuery>,
    ApiMultipart(multipart): ApiMultipart,
) -> Result<Json<PhotoUploadResponse>> {
    let date = query
        .date
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .map(parse_date)
        .transpose()?;
    let inputs = read_photos(multipart, MAX_UPLOAD_PHOTOS).await?;

    let (mut uploaded, mut events) = tokio::join!(
        upload_photos(state.storage.as_ref(), &auth.user_id, &inputs),
        enrichment::analyze_photos(Arc::clone(&state.llm), inputs.clone()),
    );
    for (event, photo) in events.iter_mut().zip(&uploaded) {
        event.photo_url = photo.url.clone();
    }

    let diary_id = match date {
        Some(date) => {
            let diary = state.db.get_or_create_diary(&auth.user_id, date).await?;
            let mut saved = 0;
            for (i, (event, photo)) in events.iter().zip(uploaded.iter_mut()).enumerate() {
                let Some(url) = event.photo_url.clone() else {
                    continue;
                };
                let (record, entry) = photo_records(event, url, i as i32);
                match state.db.save_photo_event(diary.id, &record, &entry).await {
                    Ok(_) => saved += 1,
                    Err(e) => {
                        tracing::warn!(file = %photo.filename, error = %e, "Saving photo failed");
                        photo.error = Some("Photo was uploaded but could not be saved".to_string());
                    }
                }
            }
            tracing::info!(diary_id = %diary.id, saved, "Saved photo events");
            Some(diary.id)
        }
        None => None,
    };

    Ok(Json(PhotoUploadResponse {
        photos: uploaded,
        events,
        diary_id,
    }))
}

/// POST /api/photos/analyze
pub async fn analyze(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthenticatedUser>,
    ApiMultipart(multipart): ApiMultipart,
) -> Result<Json<PhotoAnalyzeResponse>> {
    let inputs = read_photos(multipart, MAX_ANALYZE_PHOTOS).await?;
    let events = enrichment::analyze_photos(Arc::clone(&state.llm), inputs).await;

    Ok(Json(PhotoAnalyzeResponse { events }))
}

/// POST /api/photos/save
pub async fn save(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    ApiJson(request): ApiJson<SavePhotosRequest>,
) -> Result<Json<SavePhotosResponse>> {
    let diary_id = parse_uuid(&request.diary_id, "diary_id")?;
    require_diary(&state, &auth.user_id, diary_id).await?;

    let photos: Vec<NewPhoto> = request.photos.into_iter().map(NewPhoto::from).collect();
    let rows = state.db.insert_photos(diary_id, &photos).await?;

    Ok(Json(SavePhotosResponse {
        saved: rows.len(),
        photos: rows,
    }))
}

/// GET /api/photos/{diary_id}
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(diary_id): Path<String>,
) -> Result<Json<PhotosResponse>> {
    let diary_id = parse_uuid(&diary_id, "diary id")?;
    require_diary(&state, &auth.user_id, diary_id).await?;

    let photos = state.db.get_photos(&auth.user_id, diary_id).await?;
    Ok(Json(PhotosResponse { photos }))
}
