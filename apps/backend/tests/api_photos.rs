//! Photo API tests.
//!
//! These tests require a running PostgreSQL database.
//! Uploads go to a stub store; nothing leaves the process.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use serde_json::json;

use common::fixtures::DATE;
use common::{FailingModel, StubStore, TestContext};

fn photo_form(count: usize) -> MultipartForm {
    (0..count).fold(MultipartForm::new(), |form, i| {
        form.add_part(
            "files",
            Part::bytes(b"\xff\xd8\xff\xe0 not a real jpeg".to_vec())
                .file_name(format!("photo-{i}.jpg"))
                .mime_type("image/jpeg"),
        )
    })
}

/// A failing model yields one placeholder event per photo.
#[tokio::test]
#[ignore = "requires database"]
async fn test_analyze_falls_back_per_photo() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router()).unwrap();
    let (name, value) = ctx.user_header();

    let response = server
        .post("/api/photos/analyze")
        .add_header(name, value)
        .multipart(photo_form(2))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let events = body["events"].as_array().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["title"], "photo-0.jpg");
    assert_eq!(events[1]["title"], "photo-1.jpg");
    for event in events {
        assert_eq!(event["emoji"], "📸");
        assert_eq!(event["time"], "12:00");
        assert_eq!(event["time_source"], "ai");
        assert_eq!(event["source"], "photo");
    }

    ctx.cleanup().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_analyze_limit() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router()).unwrap();
    let (name, value) = ctx.user_header();

    let response = server
        .post("/api/photos/analyze")
        .add_header(name, value)
        .multipart(photo_form(6))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert!(body["message"].as_str().unwrap().contains("Maximum 5"));

    ctx.cleanup().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_upload_limit() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router()).unwrap();
    let (name, value) = ctx.user_header();

    let response = server
        .post("/api/photos/upload")
        .add_header(name, value)
        .multipart(photo_form(11))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);

    ctx.cleanup().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_save_and_list_photos() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router()).unwrap();
    let (name, value) = ctx.user_header();

    let draft = server
        .get("/api/diary/draft")
        .add_query_param("date", DATE)
        .add_header(name.clone(), value.clone())
        .await;
    let draft: serde_json::Value = draft.json();

    let response = server
        .post("/api/photos/save")
        .add_header(name.clone(), value.clone())
        .json(&json!({
            "diary_id": draft["id"],
            "photos": [
                { "url": "https://cdn.example.com/b.jpg", "extracted_time": "18:10", "time_source": "exif" },
                { "url": "https://cdn.example.com/a.jpg", "extracted_time": "08:05", "time_source": "ai" }
            ]
        }))
        .await;
    response.assert_status_ok();
    let saved: serde_json::Value = response.json();
    assert_eq!(saved["saved"], 2);

    let listed = server
        .get(&format!("/api/photos/{}", draft["id"].as_str().unwrap()))
        .add_header(name, value)
        .await;
    listed.assert_status_ok();
    let listed: serde_json::Value = listed.json();
    let urls: Vec<&str> = listed["photos"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["url"].as_str().unwrap())
        .collect();
    assert_eq!(
        urls,
        vec!["https://cdn.example.com/a.jpg", "https://cdn.example.com/b.jpg"]
    );

    ctx.cleanup().await;
}

/// A failed upload is reported on its photo; the others are saved with entries.
#[tokio::test]
#[ignore = "requires database"]
async fn test_upload_with_date_isolates_failed_photo() {
    let store = StubStore {
        failing: vec!["photo-1.jpg".to_string()],
    };
    let ctx = TestContext::with_services(Arc::new(FailingModel), Arc::new(store)).await;
    let server = TestServer::new(ctx.router()).unwrap();
    let (name, value) = ctx.user_header();

    let response = server
        .post("/api/photos/upload")
        .add_query_param("date", DATE)
        .add_header(name.clone(), value.clone())
        .multipart(photo_form(3))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let photos = body["photos"].as_array().unwrap();
    assert_eq!(photos.len(), 3);
    assert!(photos[0]["error"].is_null());
    assert!(photos[1]["url"].is_null());
    assert!(photos[1]["error"].as_str().unwrap().contains("stub upload failure"));
    assert!(photos[2]["url"].as_str().unwrap().ends_with("/photo-2.jpg"));

    let diary_id = body["diary_id"].as_str().unwrap();
    let listed = server
        .get(&format!("/api/photos/{diary_id}"))
        .add_header(name, value)
        .await;
    let listed: serde_json::Value = listed.json();
    assert_eq!(listed["photos"].as_array().unwrap().len(), 2);
    assert_eq!(ctx.count_timeline_rows(diary_id.parse().unwrap()).await, 2);

    ctx.cleanup().await;
}
