// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use crate::models::NormalizedEvent;
use serde::Serialize;
use std::borrow::Cow;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Identity verification unavailable: {0}")]
    IdentityUnavailable(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Server configuration incomplete: {0}")]
    Configuration(&'static str),

    #[error("Google API error: {0}")]
    GoogleApi(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::IdentityUnavailable(msg) => {
                tracing::error!(error = %msg, "Identity verification unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, "identity_unavailable", None)
            }
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Configuration(what) => {
                tracing::error!(missing = %what, "Calendar integration is not configured");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "config_error",
                    Some(what.to_string()),
                )
            }
            AppError::GoogleApi(msg) => {
                (StatusCode::BAD_GATEWAY, "google_error", Some(msg.clone()))
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

// ─────────────────────────────────────────────────────────────────────────────
// Calendar errors (token refresh and event fetch)
// ─────────────────────────────────────────────────────────────────────────────

/// Failure while resolving credentials or fetching events.
///
/// Only `ReauthRequired` and `Revoked` are permanent; by the time either is
/// returned the record has been marked `linked=false`.
#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("Google Calendar needs to be re-linked")]
    ReauthRequired,

    #[error("Token refresh failed: {0}")]
    TransientRefresh(String),

    #[error("Google Calendar access was revoked (HTTP {status})")]
    Revoked { status: u16 },

    #[error("Google Calendar returned HTTP {status}")]
    Provider { status: u16, body: String },

    #[error("Google Calendar request failed: {0}")]
    Network(String),

    #[error("Invalid response from Google: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl CalendarError {
    /// Whether the failure says the link is broken rather than temporarily
    /// unavailable.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::ReauthRequired | Self::Revoked { .. })
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::ReauthRequired => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Revoked { status } | Self::Provider { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::TransientRefresh(_)
            | Self::Network(_)
            | Self::InvalidResponse(_)
            | Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::ReauthRequired => "reauth_required",
            Self::TransientRefresh(_) => "refresh_failed",
            Self::Revoked { .. } => "access_revoked",
            Self::Provider { .. } => "provider_error",
            Self::Network(_) => "network_error",
            Self::InvalidResponse(_) => "invalid_response",
            Self::BadRequest(_) => "bad_request",
            Self::Storage(_) => "storage_error",
        }
    }

    fn user_message(&self) -> String {
        match self {
            Self::ReauthRequired => {
                "Google Calendar authorization expired. Please re-link your calendar.".to_string()
            }
            Self::Revoked { .. } => {
                "Google Calendar access was revoked or denied. Please re-link your calendar."
                    .to_string()
            }
            Self::Provider { status, .. } => {
                format!("Failed to fetch calendar events (status {})", status)
            }
            Self::BadRequest(msg) => msg.clone(),
            Self::TransientRefresh(_) | Self::Network(_) | Self::InvalidResponse(_) => {
                "Failed to fetch calendar events".to_string()
            }
            Self::Storage(_) => "Failed to load calendar settings".to_string(),
        }
    }
}

impl From<AppError> for CalendarError {
    fn from(err: AppError) -> Self {
        CalendarError::Storage(err.to_string())
    }
}

/// Event endpoint error body: always carries an empty `events` list.
#[derive(Serialize)]
struct EventsErrorResponse {
    error: String,
    code: &'static str,
    events: Vec<NormalizedEvent>,
}

impl IntoResponse for CalendarError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Calendar event fetch failed");
        } else {
            tracing::warn!(error = %self, status = status.as_u16(), "Calendar event fetch rejected");
        }

        let body = EventsErrorResponse {
            error: self.user_message(),
            code: self.code(),
            events: Vec::new(),
        };

        (status, Json(body)).into_response()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// OAuth callback errors
// ─────────────────────────────────────────────────────────────────────────────

/// Terminal outcome of a failed OAuth callback. Each maps to the `reason`
/// query parameter on the error redirect.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallbackError {
    #[error("Provider returned error: {0}")]
    ProviderDenied(String),

    #[error("OAuth client is not configured")]
    Configuration,

    #[error("Missing authorization code")]
    MissingCode,

    #[error("Missing state parameter")]
    NoState,

    #[error("State token rejected: {0}")]
    InvalidStateToken(String),

    #[error("State token could not be verified: {0}")]
    StateVerificationFailed(String),

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Failed to store tokens: {0}")]
    Storage(String),
}

impl CallbackError {
    /// Reason code carried to the frontend.
    pub fn reason(&self) -> Cow<'_, str> {
        match self {
            Self::ProviderDenied(reason) => Cow::Borrowed(reason.as_str()),
            Self::Configuration => Cow::Borrowed("config_error"),
            Self::MissingCode => Cow::Borrowed("no_code"),
            Self::NoState => Cow::Borrowed("no_state"),
            Self::InvalidStateToken(_) => Cow::Borrowed("invalid_state_token"),
            Self::StateVerificationFailed(_) => Cow::Borrowed("state_verification_failed"),
            Self::TokenExchange(description) => Cow::Borrowed(description.as_str()),
            Self::Storage(_) => Cow::Borrowed("storage_error"),
        }
    }
}
