// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar API routes for authenticated users.

use crate::error::{AppError, CalendarError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{CalendarStatus, NormalizedEvent};
use crate::time_utils::parse_time_zone;
use crate::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Calendar routes (require an identity token).
/// The identity middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/calendar/events", get(get_events))
        .route("/api/calendar/status", get(get_status))
        .route("/api/calendar/settings", put(update_settings))
        .route("/api/calendar/disconnect", post(disconnect))
}

// ─── Events ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// Calendar date, `YYYY-MM-DD`
    #[serde(default)]
    date: Option<String>,
    /// IANA time zone; UTC when absent
    #[serde(default)]
    tz: Option<String>,
}

/// Events for one day.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct EventsResponse {
    pub events: Vec<NormalizedEvent>,
}

/// Get the user's primary-calendar events for a day.
async fn get_events(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    query: std::result::Result<Query<EventsQuery>, QueryRejection>,
) -> std::result::Result<Json<EventsResponse>, CalendarError> {
    let Query(query) = query.map_err(|e| CalendarError::BadRequest(e.body_text()))?;
    let date = parse_date(query.date.as_deref())?;
    let tz = parse_tz(query.tz.as_deref())?;

    let events = state
        .calendar
        .events_for_day(&user.user_id, date, tz)
        .await?;

    Ok(Json(EventsResponse { events }))
}

fn parse_date(raw: Option<&str>) -> std::result::Result<NaiveDate, CalendarError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CalendarError::BadRequest("Missing date parameter (YYYY-MM-DD)".to_string()))?;

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| CalendarError::BadRequest(format!("Invalid date '{}', expected YYYY-MM-DD", raw)))
}

fn parse_tz(raw: Option<&str>) -> std::result::Result<Tz, CalendarError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(Tz::UTC),
        Some(name) => parse_time_zone(name)
            .ok_or_else(|| CalendarError::BadRequest(format!("Unknown time zone '{}'", name))),
    }
}

// ─── Link Status & Settings ──────────────────────────────────

async fn get_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<CalendarStatus>> {
    Ok(Json(state.calendar.status(&user.user_id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SettingsRequest {
    pub integration_enabled: bool,
}

/// Enable or disable the integration without unlinking.
async fn update_settings(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    body: std::result::Result<Json<SettingsRequest>, JsonRejection>,
) -> Result<Json<CalendarStatus>> {
    let Json(settings) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let status = state
        .calendar
        .set_integration_enabled(&user.user_id, settings.integration_enabled)
        .await?;

    Ok(Json(status))
}

/// Revoke the Google grant and forget the stored credentials.
async fn disconnect(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<CalendarStatus>> {
    tracing::info!(user_id = %user.user_id, "User-initiated calendar disconnect");
    Ok(Json(state.calendar.disconnect(&user.user_id).await?))
}
