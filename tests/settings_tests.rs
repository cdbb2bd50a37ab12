// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Link status, integration toggle and disconnect.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::Duration;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;

use common::{body_json, linked_record, TestApp};

fn authed(app: &TestApp, http_method: &str, uri: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method(http_method)
        .uri(uri)
        .header(
            header::AUTHORIZATION,
            format!("Bearer {}", app.identity_token("user-1")),
        )
        .header(header::CONTENT_TYPE, "application/json")
        .body(body)
        .unwrap()
}

#[tokio::test]
async fn test_status_reports_link_without_tokens() {
    let app = TestApp::with_google("https://google.invalid");
    app.store
        .insert("user-1", linked_record(Duration::minutes(30), Some("refresh")));

    let response = app.get_authed("/api/calendar/status", "user-1").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["linked"], true);
    assert_eq!(body["integrationEnabled"], true);
    assert!(body["expiresAt"].is_string());
    assert!(body.get("accessToken").is_none());
    assert!(body.get("refreshToken").is_none());
}

#[tokio::test]
async fn test_toggle_integration_keeps_credentials() {
    let app = TestApp::with_google("https://google.invalid");
    app.store
        .insert("user-1", linked_record(Duration::minutes(30), Some("refresh")));

    let response = app
        .send(authed(
            &app,
            "PUT",
            "/api/calendar/settings",
            Body::from(r#"{"integrationEnabled": false}"#),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["integrationEnabled"], false);

    let record = app.store.get("user-1").unwrap();
    assert!(!record.integration_enabled);
    assert!(record.linked);
    assert_eq!(record.refresh_token.as_deref(), Some("refresh"));
}

#[tokio::test]
async fn test_toggle_for_unknown_user_creates_record() {
    let app = TestApp::with_google("https://google.invalid");

    let response = app
        .send(authed(
            &app,
            "PUT",
            "/api/calendar/settings",
            Body::from(r#"{"integrationEnabled": false}"#),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let record = app.store.get("user-1").unwrap();
    assert!(!record.linked);
    assert!(!record.integration_enabled);
}

#[tokio::test]
async fn test_settings_rejects_malformed_body() {
    let app = TestApp::with_google("https://google.invalid");

    let response = app
        .send(authed(
            &app,
            "PUT",
            "/api/calendar/settings",
            Body::from(r#"{"integrationEnabled": "sometimes"}"#),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "bad_request");
    assert_eq!(app.store.save_count(), 0);
}

#[tokio::test]
async fn test_disconnect_revokes_and_clears_tokens() {
    let google = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/revoke"))
        .and(body_string_contains("token=refresh-xyz"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&google)
        .await;

    let app = TestApp::with_google(&google.uri());
    app.store
        .insert("user-1", linked_record(Duration::minutes(30), Some("refresh-xyz")));

    let response = app
        .send(authed(&app, "POST", "/api/calendar/disconnect", Body::empty()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["linked"], false);

    let record = app.store.get("user-1").unwrap();
    assert!(!record.linked);
    assert!(record.access_token.is_none());
    assert!(record.refresh_token.is_none());
    assert!(record.expires_at.is_none());
}

#[tokio::test]
async fn test_disconnect_survives_revoke_failure() {
    let google = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/revoke"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_token"
        })))
        .mount(&google)
        .await;

    let app = TestApp::with_google(&google.uri());
    app.store
        .insert("user-1", linked_record(Duration::minutes(30), Some("refresh-xyz")));

    let response = app
        .send(authed(&app, "POST", "/api/calendar/disconnect", Body::empty()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let record = app.store.get("user-1").unwrap();
    assert!(!record.linked);
    assert!(record.refresh_token.is_none());
}
