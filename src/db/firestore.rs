// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore-backed token store.
//!
//! Calendar link records live in the `calendar_links` collection, one
//! document per user. Saves are sent with an explicit field mask so that
//! concurrent writers touching different fields do not clobber each other.

use super::TokenStore;
use crate::db::collections;
use crate::error::AppError;
use crate::models::{CalendarLink, CalendarLinkPatch};
use async_trait::async_trait;
use chrono::Utc;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Get the calendar link record for a user.
    pub async fn get_calendar_link(&self, user_id: &str) -> Result<Option<CalendarLink>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::CALENDAR_LINKS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Merge a partial update into a user's calendar link record.
    ///
    /// Only the fields named by the patch are part of the update mask. Masked
    /// fields without a value (cleared tokens) are removed from the document.
    pub async fn merge_calendar_link(
        &self,
        user_id: &str,
        patch: &CalendarLinkPatch,
    ) -> Result<(), AppError> {
        let fields = patch.field_names();
        if fields.is_empty() {
            return Ok(());
        }

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(fields)
            .in_col(collections::CALENDAR_LINKS)
            .document_id(user_id)
            .object(patch)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl TokenStore for FirestoreDb {
    async fn load(&self, user_id: &str) -> Result<Option<CalendarLink>, AppError> {
        self.get_calendar_link(user_id).await
    }

    async fn save(&self, user_id: &str, patch: CalendarLinkPatch) -> Result<(), AppError> {
        let patch = patch.stamped(Utc::now());
        self.merge_calendar_link(user_id, &patch).await
    }
}
