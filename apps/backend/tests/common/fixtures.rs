//! Test fixtures and factory functions for request bodies.

use serde_json::{json, Value};

/// Test date used across the suites.
pub const DATE: &str = "2026-03-14";

/// A calendar event as the client submits it.
pub fn calendar_event(id: Option<&str>, title: &str, start: &str) -> Value {
    json!({
        "title": title,
        "start_time": start,
        "calendar_id": id,
    })
}

/// The standup/lunch pair used by the bridge tests.
pub fn standup_and_lunch() -> Vec<Value> {
    vec![
        calendar_event(Some("a"), "Standup", &format!("{DATE}T09:00:00+09:00")),
        calendar_event(Some("b"), "Lunch", &format!("{DATE}T12:00:00+09:00")),
    ]
}

pub fn calendar_request(date: &str, events: Vec<Value>) -> Value {
    json!({ "date": date, "events": events })
}

/// A manual timeline entry.
pub fn timeline_event(time: &str, title: &str, spending: f64) -> Value {
    json!({
        "time": time,
        "title": title,
        "emoji": "☕",
        "spending": spending,
    })
}

/// Diary save request without an explicit id.
pub fn save_diary_request(date: &str, text: &str, timeline: Vec<Value>) -> Value {
    json!({
        "date": date,
        "diary": {
            "diary_text": text,
            "total_spending": 4500.5,
            "timeline": timeline,
        }
    })
}
