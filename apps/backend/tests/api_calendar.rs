//! Calendar import API tests.
//!
//! These tests require a running PostgreSQL database.
//! Set DATABASE_URL before running.

mod common;

use std::future::IntoFuture;

use axum::http::StatusCode;
use futures::future::join_all;
use axum_test::TestServer;
use uuid::Uuid;

use common::fixtures::{self, DATE};
use common::TestContext;

async fn active_timeline(
    server: &TestServer,
    ctx: &TestContext,
    diary_id: &str,
) -> Vec<serde_json::Value> {
    let (name, value) = ctx.user_header();
    let response = server
        .get("/api/timeline")
        .add_query_param("diary_id", diary_id)
        .add_header(name, value)
        .await;
    let body: serde_json::Value = response.json();
    body["timeline"].as_array().unwrap().clone()
}

/// With emoji assignment failing, both events bridge in order with the default emoji.
#[tokio::test]
#[ignore = "requires database"]
async fn test_import_bridges_with_fallback_emoji() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router()).unwrap();
    let (name, value) = ctx.user_header();

    let response = server
        .post("/api/calendar/events")
        .add_header(name, value)
        .json(&fixtures::calendar_request(DATE, fixtures::standup_and_lunch()))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["saved"], 2);
    assert_eq!(body["timeline_inserted"], 2);

    let timeline = active_timeline(&server, &ctx, body["diary_id"].as_str().unwrap()).await;
    let rows: Vec<(&str, &str, &str)> = timeline
        .iter()
        .map(|e| {
            (
                e["time"].as_str().unwrap(),
                e["title"].as_str().unwrap(),
                e["emoji"].as_str().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        rows,
        vec![("09:00", "Standup", "📅"), ("12:00", "Lunch", "📅")]
    );
    assert!(timeline.iter().all(|e| e["source"] == "calendar" && e["spending"] == 0));

    ctx.cleanup().await;
}

/// Re-importing the same provider ids adds no timeline entries.
#[tokio::test]
#[ignore = "requires database"]
async fn test_reimport_does_not_duplicate() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router()).unwrap();
    let (name, value) = ctx.user_header();

    let request = fixtures::calendar_request(DATE, fixtures::standup_and_lunch());
    let first = server
        .post("/api/calendar/events")
        .add_header(name.clone(), value.clone())
        .json(&request)
        .await;
    let first: serde_json::Value = first.json();

    let second = server
        .post("/api/calendar/events")
        .add_header(name.clone(), value.clone())
        .json(&request)
        .await;
    second.assert_status_ok();
    let second: serde_json::Value = second.json();

    assert_eq!(first["diary_id"], second["diary_id"]);
    assert_eq!(second["timeline_inserted"], 0);

    let diary_id: Uuid = second["diary_id"].as_str().unwrap().parse().unwrap();
    assert_eq!(ctx.count_timeline_rows(diary_id).await, 2);

    // Calendar rows are replaced, not appended
    let stored = server
        .get("/api/calendar/events")
        .add_query_param("date", DATE)
        .add_header(name, value)
        .await;
    let stored: serde_json::Value = stored.json();
    assert_eq!(stored["events"].as_array().unwrap().len(), 2);

    ctx.cleanup().await;
}

/// Events without a provider id are never treated as duplicates.
#[tokio::test]
#[ignore = "requires database"]
async fn test_events_without_id_always_inserted() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router()).unwrap();
    let (name, value) = ctx.user_header();

    let request = fixtures::calendar_request(
        DATE,
        vec![fixtures::calendar_event(None, "Walk", &format!("{DATE}T18:00:00"))],
    );
    for _ in 0..2 {
        let response = server
            .post("/api/calendar/events")
            .add_header(name.clone(), value.clone())
            .json(&request)
            .await;
        response.assert_status_ok();
    }

    let draft = server
        .get("/api/diary/draft")
        .add_query_param("date", DATE)
        .add_header(name, value)
        .await;
    let draft: serde_json::Value = draft.json();
    let timeline = active_timeline(&server, &ctx, draft["id"].as_str().unwrap()).await;
    assert_eq!(timeline.len(), 2);

    ctx.cleanup().await;
}

/// Simultaneous imports of the same events bridge each event once.
#[tokio::test]
#[ignore = "requires database"]
async fn test_concurrent_imports_do_not_duplicate() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router()).unwrap();
    let (name, value) = ctx.user_header();

    let request = fixtures::calendar_request(DATE, fixtures::standup_and_lunch());
    let imports = (0..3).map(|_| {
        server
            .post("/api/calendar/events")
            .add_header(name.clone(), value.clone())
            .json(&request)
            .into_future()
    });
    let responses = join_all(imports).await;

    let mut inserted = 0;
    let mut diary_ids = Vec::new();
    for response in &responses {
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        inserted += body["timeline_inserted"].as_u64().unwrap();
        diary_ids.push(body["diary_id"].as_str().unwrap().to_string());
    }
    diary_ids.dedup();
    assert_eq!(diary_ids.len(), 1);
    assert_eq!(inserted, 2);

    let diary_id: Uuid = diary_ids[0].parse().unwrap();
    assert_eq!(ctx.count_active_calendar_rows(diary_id).await, 2);

    let stored = server
        .get("/api/calendar/events")
        .add_query_param("date", DATE)
        .add_header(name, value)
        .await;
    let stored: serde_json::Value = stored.json();
    assert_eq!(stored["events"].as_array().unwrap().len(), 2);

    ctx.cleanup().await;
}

/// A soft-deleted calendar entry no longer counts as present.
#[tokio::test]
#[ignore = "requires database"]
async fn test_reimport_after_soft_delete_restores_entry() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router()).unwrap();
    let (name, value) = ctx.user_header();

    let request = fixtures::calendar_request(DATE, fixtures::standup_and_lunch());
    let first = server
        .post("/api/calendar/events")
        .add_header(name.clone(), value.clone())
        .json(&request)
        .await;
    let first: serde_json::Value = first.json();
    let diary_id = first["diary_id"].as_str().unwrap().to_string();

    let timeline = active_timeline(&server, &ctx, &diary_id).await;
    let standup = timeline[0]["id"].as_str().unwrap();
    let _ = server
        .delete(&format!("/api/timeline/{standup}"))
        .add_header(name.clone(), value.clone())
        .await;

    let second = server
        .post("/api/calendar/events")
        .add_header(name.clone(), value.clone())
        .json(&request)
        .await;
    let second: serde_json::Value = second.json();
    assert_eq!(second["timeline_inserted"], 1);
    assert_eq!(active_timeline(&server, &ctx, &diary_id).await.len(), 2);

    // The re-imported copy is active, so the old one cannot come back
    let restore = server
        .post(&format!("/api/timeline/{standup}/restore"))
        .add_header(name, value)
        .await;
    restore.assert_status(StatusCode::CONFLICT);

    ctx.cleanup().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_delete_calendar_events_keeps_timeline() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router()).unwrap();
    let (name, value) = ctx.user_header();

    let imported = server
        .post("/api/calendar/events")
        .add_header(name.clone(), value.clone())
        .json(&fixtures::calendar_request(DATE, fixtures::standup_and_lunch()))
        .await;
    let imported: serde_json::Value = imported.json();

    let response = server
        .delete("/api/calendar/events")
        .add_query_param("date", DATE)
        .add_header(name.clone(), value.clone())
        .await;
    response.assert_status_ok();

    let stored = server
        .get("/api/calendar/events")
        .add_query_param("date", DATE)
        .add_header(name, value)
        .await;
    let stored: serde_json::Value = stored.json();
    assert!(stored["events"].as_array().unwrap().is_empty());

    let timeline =
        active_timeline(&server, &ctx, imported["diary_id"].as_str().unwrap()).await;
    assert_eq!(timeline.len(), 2);

    ctx.cleanup().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_fetch_without_google_config() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router()).unwrap();
    let (name, value) = ctx.user_header();

    let response = server
        .get("/api/calendar/fetch")
        .add_query_param("date", DATE)
        .add_header(name, value)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Google Calendar is not configured"));

    ctx.cleanup().await;
}
