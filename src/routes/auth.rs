// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google Calendar OAuth linking routes.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::HeaderMap,
    response::Redirect,
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::{CallbackError, Result};
use crate::middleware::auth::bearer_token;
use crate::services::identity::IdentityError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/google", get(auth_start))
        .route("/auth/google/callback", get(auth_callback))
}

/// Query parameters for starting the OAuth flow.
#[derive(Deserialize)]
pub struct AuthStartParams {
    /// Identity token for browser navigations that cannot set headers.
    #[serde(default)]
    token: Option<String>,
}

/// Start OAuth flow - redirect to Google consent.
///
/// The caller's identity token becomes the `state` parameter so the
/// callback knows whose calendar was linked.
async fn auth_start(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<AuthStartParams>,
) -> Result<Redirect> {
    let identity_token = bearer_token(&headers)
        .map(str::to_string)
        .or_else(|| params.token.filter(|t| !t.trim().is_empty()));

    let auth_url = state
        .calendar
        .oauth()
        .authorization_url(identity_token.as_deref())?;

    tracing::info!(
        has_state = identity_token.is_some(),
        "Starting OAuth flow, redirecting to Google"
    );

    Ok(Redirect::temporary(&auth_url))
}

#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - exchange the code and store tokens for the user named
/// by `state`. Always answers with a redirect back to the frontend.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    params: std::result::Result<Query<CallbackParams>, QueryRejection>,
) -> Redirect {
    let params = match params {
        Ok(Query(params)) => params,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed OAuth callback query");
            CallbackParams::default()
        }
    };

    match complete_link(&state, params).await {
        Ok(user_id) => {
            tracing::info!(user_id = %user_id, "OAuth successful, calendar tokens stored");
            Redirect::temporary(&state.config.calendar_success_redirect)
        }
        Err(e) => {
            let reason = e.reason();
            tracing::warn!(reason = %reason, error = %e, "OAuth callback failed");
            Redirect::temporary(&error_redirect_url(
                &state.config.calendar_error_redirect,
                &reason,
            ))
        }
    }
}

/// Linear callback steps; the first failure ends the flow.
async fn complete_link(
    state: &AppState,
    params: CallbackParams,
) -> std::result::Result<String, CallbackError> {
    if let Some(error) = non_empty(params.error) {
        return Err(CallbackError::ProviderDenied(error));
    }

    if !state.calendar.oauth().is_configured() {
        return Err(CallbackError::Configuration);
    }

    let code = non_empty(params.code).ok_or(CallbackError::MissingCode)?;
    let state_token = non_empty(params.state).ok_or(CallbackError::NoState)?;

    let identity = state
        .identity
        .verify(&state_token)
        .await
        .map_err(|e| match e {
            IdentityError::Invalid(reason) => CallbackError::InvalidStateToken(reason),
            IdentityError::Unavailable(reason) => CallbackError::StateVerificationFailed(reason),
        })?;

    tracing::info!(user_id = %identity.subject, "Exchanging authorization code for tokens");

    state
        .calendar
        .handle_oauth_callback(&code, &identity.subject)
        .await?;

    Ok(identity.subject)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Append `reason=<code>` to the configured error target.
pub fn error_redirect_url(base: &str, reason: &str) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{}{}reason={}", base, separator, urlencoding::encode(reason))
}
