// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod calendar_link;
pub mod event;

pub use calendar_link::{CalendarLink, CalendarLinkPatch, CalendarStatus};
pub use event::NormalizedEvent;
