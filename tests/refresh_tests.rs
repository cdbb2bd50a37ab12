// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Lazy access token refresh, driven through the event endpoint.

use axum::http::StatusCode;
use chrono::Duration;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;

use common::{body_json, linked_record, TestApp};

const EVENTS_PATH: &str = "/calendar/v3/calendars/primary/events";
const EVENTS_URI: &str = "/api/calendar/events?date=2024-06-01";

async fn mount_events(google: &MockServer, bearer: &str, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .and(header("authorization", format!("Bearer {}", bearer).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"items": []})))
        .expect(expected_calls)
        .mount(google)
        .await;
}

#[tokio::test]
async fn test_expired_token_refreshed_exactly_once() {
    let google = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "ya29.refreshed",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&google)
        .await;
    mount_events(&google, "ya29.refreshed", 1).await;

    let app = TestApp::with_google(&google.uri());
    let record = linked_record(Duration::minutes(-5), Some("refresh-abc"));
    let old_expiry = record.expires_at.unwrap();
    app.store.insert("user-1", record);

    let response = app.get_authed(EVENTS_URI, "user-1").await;
    assert_eq!(response.status(), StatusCode::OK);

    let stored = app.store.get("user-1").unwrap();
    assert!(stored.linked);
    assert_eq!(stored.access_token.as_deref(), Some("ya29.refreshed"));
    assert_eq!(stored.refresh_token.as_deref(), Some("refresh-abc"));
    assert!(stored.expires_at.unwrap() > old_expiry);
}

#[tokio::test]
async fn test_concurrent_requests_share_one_refresh() {
    let google = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({
                    "access_token": "ya29.refreshed",
                    "expires_in": 3599
                }))
                .set_delay(std::time::Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&google)
        .await;
    mount_events(&google, "ya29.refreshed", 3).await;

    let app = TestApp::with_google(&google.uri());
    app.store
        .insert("user-1", linked_record(Duration::minutes(-5), Some("refresh-abc")));

    let (a, b, c) = tokio::join!(
        app.get_authed(EVENTS_URI, "user-1"),
        app.get_authed(EVENTS_URI, "user-1"),
        app.get_authed(EVENTS_URI, "user-1"),
    );

    assert_eq!(a.status(), StatusCode::OK);
    assert_eq!(b.status(), StatusCode::OK);
    assert_eq!(c.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_invalid_grant_unlinks() {
    let google = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "Token has been expired or revoked."
        })))
        .mount(&google)
        .await;
    mount_events(&google, "stored_access_token", 0).await;

    let app = TestApp::with_google(&google.uri());
    app.store
        .insert("user-1", linked_record(Duration::minutes(-5), Some("revoked")));

    let response = app.get_authed(EVENTS_URI, "user-1").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response).await;
    assert_eq!(body["code"], "reauth_required");
    assert_eq!(body["events"], serde_json::json!([]));

    assert!(!app.store.get("user-1").unwrap().linked);
}

#[tokio::test]
async fn test_unauthorized_client_unlinks() {
    let google = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": "unauthorized_client"
        })))
        .mount(&google)
        .await;

    let app = TestApp::with_google(&google.uri());
    app.store
        .insert("user-1", linked_record(Duration::minutes(-5), Some("refresh")));

    let response = app.get_authed(EVENTS_URI, "user-1").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(!app.store.get("user-1").unwrap().linked);
}

#[tokio::test]
async fn test_transient_refresh_failure_keeps_link() {
    let google = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(503).set_body_string("backend unavailable"))
        .mount(&google)
        .await;
    mount_events(&google, "stored_access_token", 0).await;

    let app = TestApp::with_google(&google.uri());
    let record = linked_record(Duration::minutes(-5), Some("refresh"));
    app.store.insert("user-1", record.clone());

    let response = app.get_authed(EVENTS_URI, "user-1").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["code"], "refresh_failed");

    assert_eq!(app.store.get("user-1"), Some(record));
}

#[tokio::test]
async fn test_malformed_refresh_body_is_transient() {
    let google = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "token_type": "Bearer"
        })))
        .mount(&google)
        .await;

    let app = TestApp::with_google(&google.uri());
    app.store
        .insert("user-1", linked_record(Duration::minutes(-5), Some("refresh")));

    let response = app.get_authed(EVENTS_URI, "user-1").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(app.store.get("user-1").unwrap().linked);
}

#[tokio::test]
async fn test_unusable_refresh_lifetime_is_transient() {
    let google = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "ya29.refreshed",
            "expires_in": 9_000_000_000_000_000_000_i64
        })))
        .expect(1)
        .mount(&google)
        .await;
    mount_events(&google, "ya29.refreshed", 0).await;

    let app = TestApp::with_google(&google.uri());
    let record = linked_record(Duration::minutes(-5), Some("refresh"));
    app.store.insert("user-1", record.clone());

    let response = app.get_authed(EVENTS_URI, "user-1").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["code"], "refresh_failed");
    assert_eq!(app.store.get("user-1"), Some(record));
}

#[tokio::test]
async fn test_expired_without_refresh_token_requires_relink() {
    let google = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&google)
        .await;
    mount_events(&google, "stored_access_token", 0).await;

    let app = TestApp::with_google(&google.uri());
    app.store
        .insert("user-1", linked_record(Duration::minutes(-5), None));

    let response = app.get_authed(EVENTS_URI, "user-1").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(!app.store.get("user-1").unwrap().linked);
}
