// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth2 client: consent URL, code exchange, refresh and revoke.

use crate::config::Config;
use crate::error::AppError;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use std::time::Duration;

/// Timeout applied to every call to Google.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// OAuth error codes meaning the grant itself is dead.
const PERMANENT_REFRESH_ERRORS: [&str; 2] = ["invalid_grant", "unauthorized_client"];

/// OAuth client credentials and endpoints.
#[derive(Clone)]
pub struct GoogleOAuthClient {
    http: reqwest::Client,
    client_id: Option<String>,
    client_secret: Option<String>,
    redirect_uri: Option<String>,
    scopes: Vec<String>,
    auth_url: Option<String>,
    token_url: String,
    revoke_url: String,
}

/// Credentials required for token endpoint calls.
struct ClientCredentials<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    redirect_uri: &'a str,
}

impl GoogleOAuthClient {
    pub fn new(http: reqwest::Client, config: &Config) -> Self {
        Self {
            http,
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            redirect_uri: config.google_redirect_uri.clone(),
            scopes: config.google_scopes.clone(),
            auth_url: config.google_auth_url.clone(),
            token_url: config.google_token_url.clone(),
            revoke_url: config.google_revoke_url.clone(),
        }
    }

    /// Build the consent URL the browser is redirected to.
    ///
    /// `state` is the caller's identity token, carried back to the callback.
    pub fn authorization_url(&self, state: Option<&str>) -> Result<String, AppError> {
        let client_id = self
            .client_id
            .as_deref()
            .ok_or(AppError::Configuration("GOOGLE_CLIENT_ID"))?;
        let auth_url = self
            .auth_url
            .as_deref()
            .ok_or(AppError::Configuration("GOOGLE_AUTH_URL"))?;
        let redirect_uri = self.redirect_uri.as_deref().unwrap_or_default();

        let scope = self.scopes.join(" ");
        let mut params: Vec<(&str, &str)> = vec![
            ("client_id", client_id),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("scope", &scope),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ];
        if let Some(state) = state {
            params.push(("state", state));
        }

        let query = params
            .iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");

        let separator = if auth_url.contains('?') { '&' } else { '?' };
        Ok(format!("{}{}{}", auth_url, separator, query))
    }

    /// Requested scopes that a grant does not cover.
    pub fn missing_scopes<'a>(&'a self, tokens: &IssuedTokens) -> Vec<&'a str> {
        self.scopes
            .iter()
            .map(String::as_str)
            .filter(|scope| !tokens.has_scope(scope))
            .collect()
    }

    /// Whether everything the code exchange needs is configured.
    pub fn is_configured(&self) -> bool {
        self.credentials().is_some()
    }

    fn credentials(&self) -> Option<ClientCredentials<'_>> {
        Some(ClientCredentials {
            client_id: self.client_id.as_deref()?,
            client_secret: self.client_secret.as_deref()?,
            redirect_uri: self.redirect_uri.as_deref()?,
        })
    }

    /// Exchange an authorization code for tokens.
    ///
    /// On a non-2xx answer the error carries Google's `error_description`
    /// (falling back to `error`).
    pub async fn exchange_code(&self, code: &str) -> Result<IssuedTokens, ExchangeError> {
        let creds = self.credentials().ok_or(ExchangeError::NotConfigured)?;

        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", creds.client_id),
                ("client_secret", creds.client_secret),
                ("code", code),
                ("redirect_uri", creds.redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| ExchangeError::Failed(format!("Token exchange request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Google token exchange failed");
            let description = OAuthErrorBody::parse(&body)
                .and_then(OAuthErrorBody::into_description)
                .unwrap_or_else(|| "token_exchange_failed".to_string());
            return Err(ExchangeError::Failed(description));
        }

        let tokens: TokenResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to parse token exchange response");
            ExchangeError::Failed("token_exchange_failed".to_string())
        })?;

        tokens.into_issued(Utc::now()).map_err(|e| {
            tracing::error!(error = %e, "Rejected token exchange response");
            ExchangeError::Failed("token_exchange_failed".to_string())
        })
    }

    /// Mint a new access token from a refresh token.
    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<IssuedTokens, RefreshFailure> {
        let creds = self
            .credentials()
            .ok_or_else(|| RefreshFailure::Transient("OAuth client not configured".to_string()))?;

        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", creds.client_id),
                ("client_secret", creds.client_secret),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| RefreshFailure::Transient(format!("Token refresh request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_refresh_failure(status.as_u16(), &body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| RefreshFailure::Transient(format!("Failed to read refresh response: {}", e)))?;

        serde_json::from_str::<TokenResponse>(&body)
            .map_err(|e| RefreshFailure::Transient(format!("Malformed refresh response: {}", e)))?
            .into_issued(Utc::now())
            .map_err(RefreshFailure::Transient)
    }

    /// Revoke a token at Google. Revoking either token of a grant revokes
    /// the whole grant.
    pub async fn revoke_token(&self, token: &str) -> Result<(), AppError> {
        let response = self
            .http
            .post(&self.revoke_url)
            .form(&[("token", token)])
            .send()
            .await
            .map_err(|e| AppError::GoogleApi(format!("Revoke request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::GoogleApi(format!("HTTP {}: {}", status, body)));
        }

        tracing::info!("Google token revoked");
        Ok(())
    }
}

/// Successful token endpoint response, as sent on the wire.
#[derive(Debug, Clone, Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Lifetime of the access token in seconds.
    expires_in: i64,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

impl TokenResponse {
    /// Resolve the relative lifetime against `issued_at`.
    ///
    /// The lifetime must be positive and the resulting instant representable.
    fn into_issued(self, issued_at: DateTime<Utc>) -> Result<IssuedTokens, String> {
        if self.access_token.is_empty() {
            return Err("empty access_token".to_string());
        }
        if self.expires_in <= 0 {
            return Err(format!("non-positive expires_in: {}", self.expires_in));
        }
        let expires_at = TimeDelta::try_seconds(self.expires_in)
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
            .ok_or_else(|| format!("expires_in out of range: {}", self.expires_in))?;

        Ok(IssuedTokens {
            access_token: self.access_token,
            refresh_token: self.refresh_token.filter(|t| !t.is_empty()),
            expires_at,
            scope: self.scope,
        })
    }
}

/// Tokens issued by Google with an absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedTokens {
    pub access_token: String,
    /// Only present on the first consent (or with `prompt=consent`).
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    /// Space-separated scopes actually granted, when Google reports them.
    pub scope: Option<String>,
}

impl IssuedTokens {
    /// Whether `scope` was granted. Unknown grants count as granted.
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scope
            .as_deref()
            .is_none_or(|granted| granted.split_whitespace().any(|s| s == scope))
    }
}

/// Why a code exchange failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExchangeError {
    #[error("OAuth client is not configured")]
    NotConfigured,
    #[error("{0}")]
    Failed(String),
}

/// Outcome classification for a failed refresh.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshFailure {
    /// Google rejected the grant; the user has to consent again.
    #[error("refresh token rejected: {0}")]
    Revoked(String),
    /// Anything else: network, 5xx, malformed bodies.
    #[error("{0}")]
    Transient(String),
}

/// OAuth2 error response body (RFC 6749 section 5.2).
#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: Option<String>,
    error_description: Option<String>,
}

impl OAuthErrorBody {
    fn parse(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }

    fn into_description(self) -> Option<String> {
        self.error_description
            .filter(|d| !d.trim().is_empty())
            .or(self.error)
    }
}

fn classify_refresh_failure(status: u16, body: &str) -> RefreshFailure {
    let code = OAuthErrorBody::parse(body).and_then(|b| b.error);

    match code {
        Some(code) if PERMANENT_REFRESH_ERRORS.contains(&code.as_str()) => {
            RefreshFailure::Revoked(code)
        }
        Some(code) => RefreshFailure::Transient(format!("HTTP {}: {}", status, code)),
        None => RefreshFailure::Transient(format!("HTTP {}", status)),
    }
}
