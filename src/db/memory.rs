// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process token store for local development and tests.

use super::TokenStore;
use crate::error::AppError;
use crate::models::{CalendarLink, CalendarLinkPatch};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// `DashMap`-backed [`TokenStore`]. Clones share the same records.
#[derive(Clone, Default)]
pub struct InMemoryTokenStore {
    records: Arc<DashMap<String, CalendarLink>>,
    saves: Arc<AtomicUsize>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record directly, bypassing merge semantics.
    pub fn insert(&self, user_id: &str, record: CalendarLink) {
        self.records.insert(user_id.to_string(), record);
    }

    /// Current record for a user, if any.
    pub fn get(&self, user_id: &str) -> Option<CalendarLink> {
        self.records.get(user_id).map(|r| r.value().clone())
    }

    /// Number of `save` calls observed since creation.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn load(&self, user_id: &str) -> Result<Option<CalendarLink>, AppError> {
        Ok(self.get(user_id))
    }

    async fn save(&self, user_id: &str, patch: CalendarLinkPatch) -> Result<(), AppError> {
        let patch = patch.stamped(Utc::now());
        self.records
            .entry(user_id.to_string())
            .or_default()
            .apply(&patch);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
