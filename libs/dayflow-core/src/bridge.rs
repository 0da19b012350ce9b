//! Calendar-to-timeline bridge.
//!
//! Decides which freshly imported calendar events still need a timeline
//! entry in a diary. The dedup key is the provider event id, scoped to the
//! diary's active calendar-sourced entries; events without an id are never
//! treated as duplicates.

use std::collections::HashSet;

use crate::clock::time_from_iso;
use crate::emoji::DEFAULT_EMOJI;
use crate::types::{CalendarEventInput, SourceKind, TimelineEntryDraft};

/// Plan the timeline entries to insert for a batch of calendar events.
///
/// `events` must already be in display order. Each planned entry keeps its
/// position in `events` as `sort_order`, so entries sharing a truncated
/// `HH:MM` still list in import order. A provider id repeated inside the
/// batch is inserted only once.
pub fn plan_calendar_bridge(
    events: &[CalendarEventInput],
    existing_ids: &HashSet<String>,
) -> Vec<TimelineEntryDraft> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut drafts = Vec::with_capacity(events.len());

    for (position, event) in events.iter().enumerate() {
        if let Some(id) = event.provider_id() {
            if existing_ids.contains(id) || !seen.insert(id) {
                continue;
            }
        }
        drafts.push(to_draft(event, position));
    }

    drafts
}

fn to_draft(event: &CalendarEventInput, position: usize) -> TimelineEntryDraft {
    let emoji = event
        .emoji
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .unwrap_or(DEFAULT_EMOJI)
        .to_string();

    TimelineEntryDraft {
        time: time_from_iso(Some(&event.start_time)),
        emoji,
        title: event.title.clone(),
        description: event.description.clone(),
        location: event.location.clone(),
        spending: 0,
        category: None,
        source: SourceKind::Calendar,
        source_id: event.provider_id().map(str::to_string),
        photo_url: None,
        ai_analysis: None,
        sort_order: i32::try_from(position).unwrap_or(i32::MAX),
    }
}
