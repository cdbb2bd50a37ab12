// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar link lifecycle: code exchange, lazy token refresh, event fetch.

use crate::config::Config;
use crate::db::TokenStore;
use crate::error::{AppError, CalendarError, CallbackError};
use crate::models::{CalendarLink, CalendarLinkPatch, CalendarStatus, NormalizedEvent};
use crate::services::google_calendar::GoogleCalendarClient;
use crate::services::google_oauth::{
    ExchangeError, GoogleOAuthClient, RefreshFailure, HTTP_TIMEOUT,
};
use crate::services::normalize::normalize_events;
use crate::time_utils::day_bounds;
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Per-user refresh locks.
pub type RefreshLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Google Calendar integration for one process.
///
/// Holds no per-user state besides the refresh locks: every operation loads
/// the user's record from the [`TokenStore`].
#[derive(Clone)]
pub struct CalendarService {
    oauth: GoogleOAuthClient,
    calendar: GoogleCalendarClient,
    store: Arc<dyn TokenStore>,
    /// Per-user mutex serializing token refreshes within this process.
    refresh_locks: RefreshLocks,
}

impl CalendarService {
    /// Build the service with one shared HTTP client (10s timeout).
    pub fn new(config: &Config, store: Arc<dyn TokenStore>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;

        Ok(Self {
            oauth: GoogleOAuthClient::new(http.clone(), config),
            calendar: GoogleCalendarClient::new(http, &config.google_calendar_api_base),
            store,
            refresh_locks: Arc::new(DashMap::new()),
        })
    }

    pub fn oauth(&self) -> &GoogleOAuthClient {
        &self.oauth
    }

    // ─── OAuth Callback Handling ─────────────────────────────────────────────

    /// Exchange an authorization code and persist the resulting tokens for
    /// `user_id`. Nothing is written unless the exchange succeeds.
    pub async fn handle_oauth_callback(
        &self,
        code: &str,
        user_id: &str,
    ) -> Result<(), CallbackError> {
        let tokens = self.oauth.exchange_code(code).await.map_err(|e| match e {
            ExchangeError::NotConfigured => CallbackError::Configuration,
            ExchangeError::Failed(description) => CallbackError::TokenExchange(description),
        })?;

        if tokens.refresh_token.is_none() {
            tracing::warn!(user_id = %user_id, "Token exchange returned no refresh token");
        }
        let missing = self.oauth.missing_scopes(&tokens);
        if !missing.is_empty() {
            tracing::warn!(user_id = %user_id, missing = ?missing, "Calendar grant is missing scopes");
        }

        let expires_at = tokens.expires_at;
        let patch = CalendarLinkPatch::linked(tokens.access_token, tokens.refresh_token, expires_at);

        self.store
            .save(user_id, patch)
            .await
            .map_err(|e| CallbackError::Storage(e.to_string()))?;

        tracing::info!(user_id = %user_id, expires_at = %expires_at, "Google Calendar linked");
        Ok(())
    }

    // ─── Token Management ────────────────────────────────────────────────────

    /// Return an access token that is valid right now, refreshing it if
    /// needed.
    ///
    /// Refreshes are serialized per user. A request that waited on another
    /// request's refresh reloads the record and reuses the new token instead
    /// of refreshing again.
    pub async fn ensure_valid_access_token(
        &self,
        user_id: &str,
        record: &CalendarLink,
    ) -> Result<String, CalendarError> {
        if let Some(token) = record.valid_access_token(Utc::now()) {
            return Ok(token.to_string());
        }

        let lock = self
            .refresh_locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let current = self
            .store
            .load(user_id)
            .await?
            .unwrap_or_else(|| record.clone());

        if let Some(token) = current.valid_access_token(Utc::now()) {
            tracing::debug!(user_id = %user_id, "Token already refreshed by a concurrent request");
            return Ok(token.to_string());
        }

        let Some(refresh_token) = current.refresh_token.as_deref().filter(|t| !t.is_empty())
        else {
            tracing::warn!(user_id = %user_id, "Access token expired and no refresh token stored");
            self.unlink(user_id).await;
            return Err(CalendarError::ReauthRequired);
        };

        tracing::info!(user_id = %user_id, "Access token expired, refreshing");

        match self.oauth.refresh_access_token(refresh_token).await {
            Ok(tokens) => {
                let expires_at = tokens.expires_at;
                self.store
                    .save(
                        user_id,
                        CalendarLinkPatch::refreshed(tokens.access_token.clone(), expires_at),
                    )
                    .await?;

                tracing::info!(user_id = %user_id, expires_at = %expires_at, "Token refreshed");
                Ok(tokens.access_token)
            }
            Err(RefreshFailure::Revoked(code)) => {
                tracing::warn!(user_id = %user_id, code = %code, "Refresh token rejected, unlinking");
                self.unlink(user_id).await;
                Err(CalendarError::ReauthRequired)
            }
            Err(RefreshFailure::Transient(msg)) => {
                tracing::error!(user_id = %user_id, error = %msg, "Token refresh failed");
                Err(CalendarError::TransientRefresh(msg))
            }
        }
    }

    /// Mark the link broken. Credentials are kept so the record can be
    /// inspected; the user has to consent again either way.
    async fn unlink(&self, user_id: &str) {
        if let Err(e) = self.store.save(user_id, CalendarLinkPatch::unlinked()).await {
            tracing::error!(user_id = %user_id, error = %e, "Failed to persist unlinked state");
        }
    }

    // ─── Event Fetching ──────────────────────────────────────────────────────

    /// Fetch and normalize the user's primary-calendar events for `date`
    /// in `tz`.
    ///
    /// An unlinked or disabled integration yields an empty list without
    /// contacting Google.
    pub async fn events_for_day(
        &self,
        user_id: &str,
        date: NaiveDate,
        tz: Tz,
    ) -> Result<Vec<NormalizedEvent>, CalendarError> {
        let Some(record) = self.store.load(user_id).await? else {
            return Ok(Vec::new());
        };
        if !record.is_active() {
            tracing::debug!(
                user_id = %user_id,
                linked = record.linked,
                integration_enabled = record.integration_enabled,
                "Calendar integration inactive, skipping fetch"
            );
            return Ok(Vec::new());
        }

        let access_token = self.ensure_valid_access_token(user_id, &record).await?;

        let (time_min, time_max) = day_bounds(date, tz);
        let response = match self
            .calendar
            .list_events(&access_token, time_min, time_max)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                if e.is_permanent() {
                    self.unlink(user_id).await;
                }
                return Err(e);
            }
        };

        let events = normalize_events(&response.items);
        tracing::info!(
            user_id = %user_id,
            date = %date,
            tz = tz.name(),
            count = events.len(),
            "Fetched calendar events"
        );

        self.spawn_fetched_stamp(user_id);
        Ok(events)
    }

    /// Record `last_fetched_at` in the background. Failures only get logged.
    fn spawn_fetched_stamp(&self, user_id: &str) {
        let store = Arc::clone(&self.store);
        let user_id = user_id.to_string();
        tokio::spawn(async move {
            if let Err(e) = store
                .save(&user_id, CalendarLinkPatch::fetched_at(Utc::now()))
                .await
            {
                tracing::warn!(user_id = %user_id, error = %e, "Failed to record last fetch time");
            }
        });
    }

    // ─── Link Settings ───────────────────────────────────────────────────────

    pub async fn status(&self, user_id: &str) -> Result<CalendarStatus, AppError> {
        let record = self.store.load(user_id).await?.unwrap_or_default();
        Ok(CalendarStatus::from(&record))
    }

    /// Toggle the integration without touching the link itself.
    pub async fn set_integration_enabled(
        &self,
        user_id: &str,
        enabled: bool,
    ) -> Result<CalendarStatus, AppError> {
        self.store
            .save(user_id, CalendarLinkPatch::integration_enabled(enabled))
            .await?;
        tracing::info!(user_id = %user_id, enabled, "Calendar integration toggled");
        self.status(user_id).await
    }

    /// Revoke the grant at Google (best effort) and forget the credentials.
    pub async fn disconnect(&self, user_id: &str) -> Result<CalendarStatus, AppError> {
        let record = self.store.load(user_id).await?.unwrap_or_default();

        let token = record
            .refresh_token
            .as_deref()
            .or(record.access_token.as_deref())
            .filter(|t| !t.is_empty());

        match token {
            Some(token) => {
                if let Err(e) = self.oauth.revoke_token(token).await {
                    tracing::warn!(
                        user_id = %user_id,
                        error = %e,
                        "Failed to revoke Google token, continuing with local disconnect"
                    );
                }
            }
            None => tracing::debug!(user_id = %user_id, "No stored token to revoke"),
        }

        self.store
            .save(user_id, CalendarLinkPatch::disconnected())
            .await?;
        tracing::info!(user_id = %user_id, "Google Calendar disconnected");

        self.status(user_id).await
    }
}
