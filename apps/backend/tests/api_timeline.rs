//! Timeline API tests.
//!
//! These tests require a running PostgreSQL database.
//! Set DATABASE_URL before running.

mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::json;

use common::fixtures::DATE;
use common::TestContext;

async fn draft_diary(server: &TestServer, ctx: &TestContext) -> String {
    let (name, value) = ctx.user_header();
    let response = server
        .get("/api/diary/draft")
        .add_query_param("date", DATE)
        .add_header(name, value)
        .await;
    let body: serde_json::Value = response.json();
    body["id"].as_str().unwrap().to_string()
}

/// A manual entry without an emoji gets the default when the model is down.
#[tokio::test]
#[ignore = "requires database"]
async fn test_add_event_falls_back_to_default_emoji() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router()).unwrap();
    let (name, value) = ctx.user_header();
    let diary_id = draft_diary(&server, &ctx).await;

    let response = server
        .post("/api/timeline/add")
        .add_header(name, value)
        .json(&json!({
            "diary_id": diary_id,
            "event": { "time": "7:45", "title": "Morning run", "spending": 0 }
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["event"]["emoji"], "📅");
    assert_eq!(body["event"]["time"], "07:45");
    assert_eq!(body["event"]["source"], "manual");

    ctx.cleanup().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_add_event_rejects_bad_time() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router()).unwrap();
    let (name, value) = ctx.user_header();
    let diary_id = draft_diary(&server, &ctx).await;

    let response = server
        .post("/api/timeline/add")
        .add_header(name, value)
        .json(&json!({
            "diary_id": diary_id,
            "event": { "time": "25:00", "title": "Impossible" }
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);

    ctx.cleanup().await;
}

/// Soft delete hides an entry from the list; it stays fetchable and restorable.
#[tokio::test]
#[ignore = "requires database"]
async fn test_soft_delete_and_restore() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router()).unwrap();
    let (name, value) = ctx.user_header();
    let diary_id = draft_diary(&server, &ctx).await;

    let added = server
        .post("/api/timeline/add")
        .add_header(name.clone(), value.clone())
        .json(&json!({
            "diary_id": diary_id,
            "event": { "time": "12:30", "title": "Lunch", "emoji": "🍜", "spending": 12000 }
        }))
        .await;
    let added: serde_json::Value = added.json();
    let event_id = added["event"]["id"].as_str().unwrap().to_string();

    let response = server
        .delete(&format!("/api/timeline/{event_id}"))
        .add_header(name.clone(), value.clone())
        .await;
    response.assert_status_ok();

    let list = server
        .get("/api/timeline")
        .add_query_param("diary_id", &diary_id)
        .add_header(name.clone(), value.clone())
        .await;
    let list: serde_json::Value = list.json();
    assert!(list["timeline"].as_array().unwrap().is_empty());

    let direct = server
        .get(&format!("/api/timeline/{event_id}"))
        .add_header(name.clone(), value.clone())
        .await;
    direct.assert_status_ok();
    let direct: serde_json::Value = direct.json();
    assert_eq!(direct["is_deleted"], true);

    let restored = server
        .post(&format!("/api/timeline/{event_id}/restore"))
        .add_header(name.clone(), value.clone())
        .await;
    restored.assert_status_ok();

    let list = server
        .get("/api/timeline")
        .add_query_param("diary_id", &diary_id)
        .add_header(name, value)
        .await;
    let list: serde_json::Value = list.json();
    assert_eq!(list["timeline"].as_array().unwrap().len(), 1);

    ctx.cleanup().await;
}

/// Spending updates are rounded half to even before storage.
#[tokio::test]
#[ignore = "requires database"]
async fn test_update_spending_rounds() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router()).unwrap();
    let (name, value) = ctx.user_header();
    let diary_id = draft_diary(&server, &ctx).await;

    let added = server
        .post("/api/timeline/add")
        .add_header(name.clone(), value.clone())
        .json(&json!({
            "diary_id": diary_id,
            "event": { "time": "09:00", "title": "Coffee", "emoji": "☕" }
        }))
        .await;
    let added: serde_json::Value = added.json();

    let response = server
        .put("/api/timeline/spending")
        .add_header(name, value)
        .json(&json!({ "event_id": added["event"]["id"], "spending": 2.5 }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["spending"], 2);

    ctx.cleanup().await;
}

/// Active entries come back ordered by time, then explicit sort order.
#[tokio::test]
#[ignore = "requires database"]
async fn test_timeline_ordering() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router()).unwrap();
    let (name, value) = ctx.user_header();

    let saved = server
        .post("/api/diary/save")
        .add_header(name.clone(), value.clone())
        .json(&json!({
            "date": DATE,
            "diary": {
                "timeline": [
                    { "time": "18:00", "title": "Dinner", "emoji": "🍽️" },
                    { "time": "09:00", "title": "First", "emoji": "1️⃣" },
                    { "time": "09:00", "title": "Second", "emoji": "2️⃣" }
                ]
            }
        }))
        .await;
    let saved: serde_json::Value = saved.json();

    let list = server
        .get("/api/timeline")
        .add_query_param("diary_id", saved["id"].as_str().unwrap())
        .add_header(name, value)
        .await;
    let list: serde_json::Value = list.json();
    let titles: Vec<&str> = list["timeline"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["First", "Second", "Dinner"]);

    ctx.cleanup().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_unknown_event_not_found() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router()).unwrap();
    let (name, value) = ctx.user_header();

    let response = server
        .delete(&format!("/api/timeline/{}", uuid::Uuid::new_v4()))
        .add_header(name, value)
        .await;

    response.assert_status(StatusCode::NOT_FOUND);

    ctx.cleanup().await;
}
