// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod calendar;
pub mod google_calendar;
pub mod google_identity;
pub mod google_oauth;
pub mod identity;
pub mod normalize;

pub use calendar::CalendarService;
pub use google_calendar::GoogleCalendarClient;
pub use google_identity::GoogleIdTokenVerifier;
pub use google_oauth::GoogleOAuthClient;
pub use identity::{IdentityError, IdentityVerifier, SessionTokenVerifier, VerifiedIdentity};
