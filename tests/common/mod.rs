// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, Response};
use calendar_bridge::config::Config;
use calendar_bridge::db::{FirestoreDb, InMemoryTokenStore};
use calendar_bridge::models::CalendarLink;
use calendar_bridge::routes::create_router;
use calendar_bridge::services::identity::create_session_token;
use calendar_bridge::services::{IdentityVerifier, SessionTokenVerifier};
use calendar_bridge::AppState;
use chrono::{Duration, Utc};
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// App wired to an in-memory store, an HS256 identity verifier and Google
/// endpoints under `google_base` (usually a wiremock server).
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub store: InMemoryTokenStore,
}

#[allow(dead_code)]
impl TestApp {
    pub fn with_config(config: Config) -> Self {
        let identity = Arc::new(SessionTokenVerifier::new(&config.session_signing_key));
        Self::with_verifier(config, identity)
    }

    pub fn with_verifier(config: Config, identity: Arc<dyn IdentityVerifier>) -> Self {
        let store = InMemoryTokenStore::new();
        let state = Arc::new(
            AppState::new(config, Arc::new(store.clone()), identity)
                .expect("Failed to build app state"),
        );

        Self {
            router: create_router(state.clone()),
            state,
            store,
        }
    }

    pub fn with_google(google_base: &str) -> Self {
        Self::with_config(Config::test_default_with_google(google_base))
    }

    /// A valid identity token for `user_id`.
    pub fn identity_token(&self, user_id: &str) -> String {
        create_session_token(user_id, &self.state.config.session_signing_key)
            .expect("Failed to mint session token")
    }

    /// Send a request through a fresh clone of the router.
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        use tower::ServiceExt;
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get_authed(&self, uri: &str, user_id: &str) -> Response<Body> {
        self.send(
            Request::builder()
                .uri(uri)
                .header(
                    header::AUTHORIZATION,
                    format!("Bearer {}", self.identity_token(user_id)),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }
}

/// Create a test app whose Google endpoints are unreachable.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    TestApp::with_config(Config::test_default())
}

/// A linked record whose access token expires `expires_in` from now.
#[allow(dead_code)]
pub fn linked_record(expires_in: Duration, refresh_token: Option<&str>) -> CalendarLink {
    CalendarLink {
        access_token: Some("stored_access_token".to_string()),
        refresh_token: refresh_token.map(str::to_string),
        expires_at: Some(Utc::now() + expires_in),
        linked: true,
        integration_enabled: true,
        ..CalendarLink::default()
    }
}

#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// `Location` header of a redirect.
#[allow(dead_code)]
pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("redirect without Location")
        .to_str()
        .unwrap()
        .to_string()
}
