// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! OAuth client values are optional here. A deployment missing them still
//! starts, and the authorization and callback handlers report the gap to the
//! browser (`config_error`) instead of the process refusing to boot.

use std::env;

const DEFAULT_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_REVOKE_URL: &str = "https://oauth2.googleapis.com/revoke";
const DEFAULT_CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";

/// Which [`crate::db::TokenStore`] backs the calendar link records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStoreKind {
    Firestore,
    Memory,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Google OAuth client ---
    /// OAuth client ID (public)
    pub google_client_id: Option<String>,
    /// OAuth client secret
    pub google_client_secret: Option<String>,
    /// Callback URL registered with Google
    pub google_redirect_uri: Option<String>,
    /// Scopes requested at consent time
    pub google_scopes: Vec<String>,
    /// Consent endpoint base URL
    pub google_auth_url: Option<String>,
    pub google_token_url: String,
    pub google_revoke_url: String,
    pub google_calendar_api_base: String,

    // --- Browser redirects ---
    /// Frontend URL used for CORS and default redirect targets
    pub frontend_url: String,
    /// Where the callback sends the browser after a successful link
    pub calendar_success_redirect: String,
    /// Where the callback sends the browser on failure (`reason` is appended)
    pub calendar_error_redirect: String,

    // --- Identity & storage ---
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Project whose ID tokens identify end users. `None` disables the
    /// Google ID token verifier in favour of `session_signing_key`.
    pub identity_project_id: Option<String>,
    /// HS256 key for locally minted identity tokens (raw bytes)
    pub session_signing_key: Vec<u8>,
    pub token_store: TokenStoreKind,
    /// Server port
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".to_string());
        let frontend_url = frontend_url.trim_end_matches('/').to_string();

        let token_store = match env::var("TOKEN_STORE").as_deref() {
            Ok("memory") => TokenStoreKind::Memory,
            Ok("firestore") | Err(_) => TokenStoreKind::Firestore,
            Ok(_) => return Err(ConfigError::Invalid("TOKEN_STORE")),
        };

        let identity_project_id = optional_var("IDENTITY_PROJECT_ID");
        let session_signing_key = optional_var("SESSION_SIGNING_KEY")
            .map(String::into_bytes)
            .unwrap_or_default();

        if identity_project_id.is_none() && session_signing_key.is_empty() {
            return Err(ConfigError::Missing(
                "IDENTITY_PROJECT_ID or SESSION_SIGNING_KEY",
            ));
        }

        Ok(Self {
            google_client_id: optional_var("GOOGLE_CLIENT_ID"),
            google_client_secret: optional_var("GOOGLE_CLIENT_SECRET"),
            google_redirect_uri: optional_var("GOOGLE_REDIRECT_URI"),
            google_scopes: optional_var("GOOGLE_SCOPES")
                .map(|raw| parse_scopes(&raw))
                .unwrap_or_else(|| vec![DEFAULT_SCOPE.to_string()]),
            google_auth_url: Some(
                optional_var("GOOGLE_AUTH_URL").unwrap_or_else(|| DEFAULT_AUTH_URL.to_string()),
            ),
            google_token_url: optional_var("GOOGLE_TOKEN_URL")
                .unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
            google_revoke_url: optional_var("GOOGLE_REVOKE_URL")
                .unwrap_or_else(|| DEFAULT_REVOKE_URL.to_string()),
            google_calendar_api_base: optional_var("GOOGLE_CALENDAR_API_BASE")
                .unwrap_or_else(|| DEFAULT_CALENDAR_API_BASE.to_string()),
            calendar_success_redirect: optional_var("CALENDAR_SUCCESS_REDIRECT")
                .unwrap_or_else(|| format!("{}/settings?calendar=linked", frontend_url)),
            calendar_error_redirect: optional_var("CALENDAR_ERROR_REDIRECT")
                .unwrap_or_else(|| format!("{}/settings?calendar=error", frontend_url)),
            frontend_url,
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            identity_project_id,
            session_signing_key,
            token_store,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
        })
    }

    /// Deterministic configuration for tests. Google endpoints point at
    /// `google_base`, typically a mock server.
    pub fn test_default_with_google(google_base: &str) -> Self {
        let google_base = google_base.trim_end_matches('/');
        Self {
            google_client_id: Some("test_client_id".to_string()),
            google_client_secret: Some("test_secret".to_string()),
            google_redirect_uri: Some("http://localhost:8080/auth/google/callback".to_string()),
            google_scopes: vec![
                DEFAULT_SCOPE.to_string(),
                "https://www.googleapis.com/auth/calendar.events.readonly".to_string(),
            ],
            google_auth_url: Some(format!("{}/o/oauth2/v2/auth", google_base)),
            google_token_url: format!("{}/token", google_base),
            google_revoke_url: format!("{}/revoke", google_base),
            google_calendar_api_base: format!("{}/calendar/v3", google_base),
            frontend_url: "http://localhost:5173".to_string(),
            calendar_success_redirect: "http://localhost:5173/settings?calendar=linked"
                .to_string(),
            calendar_error_redirect: "http://localhost:5173/settings?calendar=error".to_string(),
            gcp_project_id: "test-project".to_string(),
            identity_project_id: None,
            session_signing_key: b"test_session_key_32_bytes_minimum".to_vec(),
            token_store: TokenStoreKind::Memory,
            port: 8080,
        }
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self::test_default_with_google("https://oauth2.invalid")
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Split a scope list on whitespace or commas.
fn parse_scopes(raw: &str) -> Vec<String> {
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
