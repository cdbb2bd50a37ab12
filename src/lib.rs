// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar-Bridge: Google Calendar linking and event fetching
//!
//! This crate provides the backend API that links a user's Google Calendar
//! via OAuth2, keeps the credentials fresh, and serves a day's events in a
//! provider-agnostic shape.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::TokenStore;
use services::{CalendarService, IdentityVerifier};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub identity: Arc<dyn IdentityVerifier>,
    pub calendar: CalendarService,
}

impl AppState {
    /// Wire the calendar service to `token_store`.
    pub fn new(
        config: Config,
        token_store: Arc<dyn TokenStore>,
        identity: Arc<dyn IdentityVerifier>,
    ) -> anyhow::Result<Self> {
        let calendar = CalendarService::new(&config, token_store)?;
        Ok(Self {
            config,
            identity,
            calendar,
        })
    }
}
