// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Persistence for calendar link records.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::InMemoryTokenStore;

use crate::error::AppError;
use crate::models::{CalendarLink, CalendarLinkPatch};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    /// Calendar link records (keyed by user ID)
    pub const CALENDAR_LINKS: &str = "calendar_links";
}

/// Per-user calendar credential storage.
///
/// `save` merges: fields the patch does not supply are left untouched and the
/// record is created if it does not exist. Concurrent writers are not
/// isolated from each other; the last write of a field wins.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn load(&self, user_id: &str) -> Result<Option<CalendarLink>, AppError>;

    async fn save(&self, user_id: &str, patch: CalendarLinkPatch) -> Result<(), AppError>;
}
