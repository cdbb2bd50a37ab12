// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar-Bridge API Server
//!
//! Links users' Google Calendars via OAuth2 and serves their daily events.

use calendar_bridge::{
    config::{Config, TokenStoreKind},
    db::{FirestoreDb, InMemoryTokenStore, TokenStore},
    services::{GoogleIdTokenVerifier, IdentityVerifier, SessionTokenVerifier},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Calendar-Bridge API");

    if config.google_client_id.is_none()
        || config.google_client_secret.is_none()
        || config.google_redirect_uri.is_none()
    {
        tracing::warn!("Google OAuth client is not fully configured; linking will fail with config_error");
    }

    let token_store: Arc<dyn TokenStore> = match config.token_store {
        TokenStoreKind::Firestore => Arc::new(
            FirestoreDb::new(&config.gcp_project_id)
                .await
                .expect("Failed to connect to Firestore"),
        ),
        TokenStoreKind::Memory => {
            tracing::warn!("Using in-memory token store; links are lost on restart");
            Arc::new(InMemoryTokenStore::new())
        }
    };

    let identity: Arc<dyn IdentityVerifier> = match &config.identity_project_id {
        Some(project_id) => {
            tracing::info!(project = %project_id, "Verifying Google ID tokens");
            Arc::new(
                GoogleIdTokenVerifier::new(project_id)
                    .expect("Failed to initialize ID token verifier"),
            )
        }
        None => {
            tracing::info!("Verifying locally signed session tokens");
            Arc::new(SessionTokenVerifier::new(&config.session_signing_key))
        }
    };

    // Build shared state
    let state = Arc::new(
        AppState::new(config.clone(), token_store, identity)
            .expect("Failed to initialize calendar service"),
    );

    // Build router
    let app = calendar_bridge::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("calendar_bridge=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
