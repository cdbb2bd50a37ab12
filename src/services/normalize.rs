// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Mapping of Google Calendar events to [`NormalizedEvent`].

use super::google_calendar::ApiEvent;
use crate::models::NormalizedEvent;

/// Title used when an event has no summary.
pub const UNTITLED: &str = "(No Title)";

/// Color used when an event has no (or an unknown) `colorId`.
pub const DEFAULT_COLOR: &str = "#9e9e9e";

/// Google Calendar event color palette, indexed by `colorId`.
const EVENT_COLORS: [(&str, &str); 11] = [
    ("1", "#7986cb"),
    ("2", "#33b679"),
    ("3", "#8e24aa"),
    ("4", "#e67c73"),
    ("5", "#f6bf26"),
    ("6", "#f4511e"),
    ("7", "#039be5"),
    ("8", "#616161"),
    ("9", "#3f51b5"),
    ("10", "#0b8043"),
    ("11", "#d50000"),
];

/// Resolve a `colorId` to its hex value.
pub fn event_color(color_id: Option<&str>) -> &'static str {
    color_id
        .and_then(|id| {
            EVENT_COLORS
                .iter()
                .find(|(key, _)| *key == id)
                .map(|(_, hex)| *hex)
        })
        .unwrap_or(DEFAULT_COLOR)
}

/// Map one provider event. Returns `None` when the start carries neither
/// `dateTime` nor `date`.
pub fn normalize_event(event: &ApiEvent) -> Option<NormalizedEvent> {
    let start = event.start.as_ref()?;
    let start_time = start.value()?.to_string();
    let end_time = event
        .end
        .as_ref()
        .and_then(|end| end.value())
        .map(str::to_string)
        .unwrap_or_else(|| start_time.clone());

    let title = event
        .summary
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(UNTITLED)
        .to_string();

    Some(NormalizedEvent {
        id: event.id.clone(),
        title,
        start_time,
        end_time,
        all_day: start.is_date_only(),
        description: event.description.clone(),
        color: event_color(event.color_id.as_deref()).to_string(),
    })
}

/// Map a page of provider events, dropping (and logging) malformed ones.
pub fn normalize_events(events: &[ApiEvent]) -> Vec<NormalizedEvent> {
    events
        .iter()
        .filter_map(|event| {
            let normalized = normalize_event(event);
            if normalized.is_none() {
                tracing::warn!(event_id = %event.id, "Dropping calendar event without a start time");
            }
            normalized
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::google_calendar::ApiEventTime;

    fn timed(id: &str, start: &str, end: &str) -> ApiEvent {
        ApiEvent {
            id: id.to_string(),
            summary: Some("Design review".to_string()),
            start: Some(ApiEventTime {
                date_time: Some(start.to_string()),
                ..Default::default()
            }),
            end: Some(ApiEventTime {
                date_time: Some(end.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn all_day(id: &str, date: &str) -> ApiEvent {
        ApiEvent {
            id: id.to_string(),
            summary: Some("Offsite".to_string()),
            start: Some(ApiEventTime {
                date: Some(date.to_string()),
                ..Default::default()
            }),
            end: Some(ApiEventTime {
                date: Some(date.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_timed_event() {
        let mut event = timed("a", "2024-06-01T10:00:00Z", "2024-06-01T11:00:00Z");
        event.color_id = Some("11".to_string());
        event.description = Some("Agenda in doc".to_string());

        let normalized = normalize_event(&event).unwrap();
        assert_eq!(normalized.id, "a");
        assert_eq!(normalized.title, "Design review");
        assert_eq!(normalized.start_time, "2024-06-01T10:00:00Z");
        assert_eq!(normalized.end_time, "2024-06-01T11:00:00Z");
        assert!(!normalized.all_day);
        assert_eq!(normalized.color, "#d50000");
        assert_eq!(normalized.description.as_deref(), Some("Agenda in doc"));
    }

    #[test]
    fn test_date_only_is_all_day() {
        let normalized = normalize_event(&all_day("b", "2024-06-01")).unwrap();
        assert!(normalized.all_day);
        assert_eq!(normalized.start_time, "2024-06-01");
        assert_eq!(normalized.color, DEFAULT_COLOR);
    }

    #[test]
    fn test_missing_or_blank_summary() {
        let mut event = timed("c", "2024-06-01T10:00:00Z", "2024-06-01T10:30:00Z");
        event.summary = None;
        assert_eq!(normalize_event(&event).unwrap().title, UNTITLED);

        event.summary = Some(String::new());
        assert_eq!(normalize_event(&event).unwrap().title, UNTITLED);
    }

    #[test]
    fn test_unknown_color_falls_back() {
        assert_eq!(event_color(Some("42")), DEFAULT_COLOR);
        assert_eq!(event_color(None), DEFAULT_COLOR);
        assert_eq!(event_color(Some("1")), "#7986cb");
    }

    #[test]
    fn test_event_without_start_is_dropped() {
        let mut broken = timed("d", "2024-06-01T10:00:00Z", "2024-06-01T11:00:00Z");
        broken.start = Some(ApiEventTime::default());
        let mut no_start = broken.clone();
        no_start.start = None;

        let events = vec![broken, all_day("e", "2024-06-01"), no_start];
        let normalized = normalize_events(&events);
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized[0].id, "e");
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let events = vec![
            timed("a", "2024-06-01T10:00:00Z", "2024-06-01T11:00:00Z"),
            all_day("b", "2024-06-01"),
        ];
        assert_eq!(normalize_events(&events), normalize_events(&events));
    }
}
