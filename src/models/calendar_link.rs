// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-user calendar link record and the partial updates applied to it.

use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Calendar link record stored in Firestore (document ID is the user ID).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarLink {
    /// Short-lived provider access token
    #[serde(default)]
    pub access_token: Option<String>,
    /// Long-lived refresh token (Google only returns it on first consent)
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// When the access token expires
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Whether the calendar account is associated and usable
    #[serde(default)]
    pub linked: bool,
    /// User-facing toggle; absent means enabled
    #[serde(default = "default_true")]
    pub integration_enabled: bool,
    /// Last successful event fetch (informational)
    #[serde(default)]
    pub last_fetched_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

impl Default for CalendarLink {
    fn default() -> Self {
        Self {
            access_token: None,
            refresh_token: None,
            expires_at: None,
            linked: false,
            integration_enabled: true,
            last_fetched_at: None,
            updated_at: None,
        }
    }
}

impl CalendarLink {
    /// The stored access token, if present and `now < expires_at`.
    pub fn valid_access_token(&self, now: DateTime<Utc>) -> Option<&str> {
        match (self.access_token.as_deref(), self.expires_at) {
            (Some(token), Some(expires_at)) if !token.is_empty() && now < expires_at => {
                Some(token)
            }
            _ => None,
        }
    }

    /// Whether event fetches should reach the provider at all.
    pub fn is_active(&self) -> bool {
        self.linked && self.integration_enabled
    }

    /// Merge a patch into this record: supplied fields overwrite, the rest
    /// are left untouched.
    pub fn apply(&mut self, patch: &CalendarLinkPatch) {
        if patch.clear_tokens {
            self.access_token = None;
            self.refresh_token = None;
            self.expires_at = None;
        }
        if let Some(token) = &patch.access_token {
            self.access_token = Some(token.clone());
        }
        if let Some(token) = &patch.refresh_token {
            self.refresh_token = Some(token.clone());
        }
        if let Some(expires_at) = patch.expires_at {
            self.expires_at = Some(expires_at);
        }
        if let Some(linked) = patch.linked {
            self.linked = linked;
        }
        if let Some(enabled) = patch.integration_enabled {
            self.integration_enabled = enabled;
        }
        if let Some(fetched) = patch.last_fetched_at {
            self.last_fetched_at = Some(fetched);
        }
        if let Some(updated) = patch.updated_at {
            self.updated_at = Some(updated);
        }
    }
}

/// Partial update of a [`CalendarLink`].
///
/// Serializes only the supplied fields. `clear_tokens` removes the stored
/// credentials; the Firestore store expresses it by masking the token fields
/// without sending values for them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarLinkPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integration_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_fetched_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub clear_tokens: bool,
}

impl CalendarLinkPatch {
    /// Tokens from a successful code exchange. A missing refresh token keeps
    /// whatever was stored before.
    pub fn linked(
        access_token: String,
        refresh_token: Option<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: Some(access_token),
            refresh_token,
            expires_at: Some(expires_at),
            linked: Some(true),
            ..Self::default()
        }
    }

    /// A renewed access token. The refresh token is retained.
    pub fn refreshed(access_token: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            access_token: Some(access_token),
            expires_at: Some(expires_at),
            linked: Some(true),
            ..Self::default()
        }
    }

    /// Permanent credential failure.
    pub fn unlinked() -> Self {
        Self {
            linked: Some(false),
            ..Self::default()
        }
    }

    /// User-initiated disconnect: unlink and drop the stored credentials.
    pub fn disconnected() -> Self {
        Self {
            linked: Some(false),
            clear_tokens: true,
            ..Self::default()
        }
    }

    pub fn integration_enabled(enabled: bool) -> Self {
        Self {
            integration_enabled: Some(enabled),
            ..Self::default()
        }
    }

    pub fn fetched_at(at: DateTime<Utc>) -> Self {
        Self {
            last_fetched_at: Some(at),
            ..Self::default()
        }
    }

    /// Stamp the informational `updated_at` field.
    pub fn stamped(mut self, at: DateTime<Utc>) -> Self {
        self.updated_at = Some(at);
        self
    }

    /// Document fields this patch writes (the Firestore update mask).
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.access_token.is_some() || self.clear_tokens {
            fields.push("access_token");
        }
        if self.refresh_token.is_some() || self.clear_tokens {
            fields.push("refresh_token");
        }
        if self.expires_at.is_some() || self.clear_tokens {
            fields.push("expires_at");
        }
        if self.linked.is_some() {
            fields.push("linked");
        }
        if self.integration_enabled.is_some() {
            fields.push("integration_enabled");
        }
        if self.last_fetched_at.is_some() {
            fields.push("last_fetched_at");
        }
        if self.updated_at.is_some() {
            fields.push("updated_at");
        }
        fields
    }
}

/// Link state reported to the frontend (no credentials).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CalendarStatus {
    pub linked: bool,
    pub integration_enabled: bool,
    pub last_fetched_at: Option<String>,
    pub expires_at: Option<String>,
}

impl From<&CalendarLink> for CalendarStatus {
    fn from(record: &CalendarLink) -> Self {
        Self {
            linked: record.linked,
            integration_enabled: record.integration_enabled,
            last_fetched_at: record.last_fetched_at.map(format_utc_rfc3339),
            expires_at: record.expires_at.map(format_utc_rfc3339),
        }
    }
}
