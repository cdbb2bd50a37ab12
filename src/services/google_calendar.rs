// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google Calendar v3 API client.
//!
//! Only the primary calendar's event list is used. Responses are parsed into
//! explicit schemas here; mapping to [`crate::models::NormalizedEvent`] lives
//! in [`super::normalize`].

use crate::error::CalendarError;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::time_utils::format_utc_rfc3339_millis;

/// Upper bound on events returned for one day.
pub const MAX_RESULTS: u32 = 50;

/// Google Calendar API client.
#[derive(Clone)]
pub struct GoogleCalendarClient {
    http: reqwest::Client,
    base_url: String,
}

impl GoogleCalendarClient {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// List single (expanded) events of the primary calendar that overlap
    /// `[time_min, time_max]`, ordered by start time.
    pub async fn list_events(
        &self,
        access_token: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<EventListResponse, CalendarError> {
        let url = format!("{}/calendars/primary/events", self.base_url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[
                ("timeMin", format_utc_rfc3339_millis(time_min)),
                ("timeMax", format_utc_rfc3339_millis(time_max)),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
                ("maxResults", MAX_RESULTS.to_string()),
            ])
            .send()
            .await
            .map_err(|e| CalendarError::Network(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Check response status and parse the JSON body.
    ///
    /// 401 and 403 mean the grant no longer covers the calendar.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, CalendarError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 401 || status.as_u16() == 403 {
                tracing::warn!(status = %status, body = %body, "Google Calendar rejected credentials");
                return Err(CalendarError::Revoked {
                    status: status.as_u16(),
                });
            }

            return Err(CalendarError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| CalendarError::InvalidResponse(format!("JSON parse error: {}", e)))
    }
}

/// `events.list` response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventListResponse {
    #[serde(default)]
    pub items: Vec<ApiEvent>,
}

/// One calendar event as returned by the API (only the fields we use).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEvent {
    pub id: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start: Option<ApiEventTime>,
    #[serde(default)]
    pub end: Option<ApiEventTime>,
    #[serde(default)]
    pub color_id: Option<String>,
}

/// Start or end of an event: `dateTime` for timed events, `date` for
/// all-day events.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEventTime {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub date_time: Option<String>,
}

impl ApiEventTime {
    /// `dateTime` if present, otherwise `date`.
    pub fn value(&self) -> Option<&str> {
        self.date_time.as_deref().or(self.date.as_deref())
    }

    /// True when only a calendar date is given.
    pub fn is_date_only(&self) -> bool {
        self.date_time.is_none() && self.date.is_some()
    }
}
