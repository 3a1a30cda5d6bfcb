//! HTTP tests for the audit routes
//!
//! Requests go straight through the router with `tower::ServiceExt::oneshot`;
//! no socket is bound.

use std::sync::Arc;

use audit_server::{ServerConfig, open_service, router};
use audit_storage::{EventAuditService, InMemoryBlobStore};
use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode, header};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

const MAIN_EVENT: &[u8] = include_bytes!("../../audit-storage/tests/fixtures/kafka-events-main.json");

fn app() -> Router {
    router(EventAuditService::new(Arc::new(InMemoryBlobStore::new())))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body)
}

fn post_event(body: impl Into<Body>) -> Request<Body> {
    Request::post("/events/audit")
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn error_message(body: &[u8]) -> String {
    let json: serde_json::Value = serde_json::from_slice(body).unwrap();
    json["error"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let (status, _, body) = send(&app(), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], br#"{"status":"ok"}"#);
}

#[tokio::test]
async fn test_save_then_read() {
    let app = app();

    let (status, _, body) = send(&app, post_event(MAIN_EVENT)).await;
    assert_eq!(status, StatusCode::OK);

    let id = String::from_utf8(body.to_vec()).unwrap();
    assert_eq!(id.len(), 24);
    assert!(id.bytes().all(|b| b.is_ascii_hexdigit()));

    let (status, headers, body) = send(&app, get(&format!("/events/audit/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    assert_eq!(headers[header::CONTENT_LENGTH], "1163");
    assert_eq!(&body[..], MAIN_EVENT);
}

#[tokio::test]
async fn test_metadata_endpoint() {
    let app = app();
    let (_, _, body) = send(&app, post_event(MAIN_EVENT)).await;
    let id = String::from_utf8(body.to_vec()).unwrap();

    let (status, headers, body) = send(&app, get(&format!("/events/audit/{id}/metadata"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");

    let record: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(record["id"], id.as_str());
    assert_eq!(record["filename"], "65027303.json");
    assert_eq!(record["length"], 1163);
    assert_eq!(record["metadata"]["type"], "main");
    assert_eq!(record["metadata"]["dataType"], "BlockAdded");
    assert_eq!(record["metadata"]["source"], "http://65.21.235.219:9999");
    assert_eq!(record["metadata"]["id"], 65027303);
}

#[tokio::test]
async fn test_unknown_ids_are_404() {
    let app = app();

    for uri in [
        "/events/audit/does-not-exist",
        "/events/audit/0000000000000000000000ff",
        "/events/audit/does-not-exist/metadata",
    ] {
        let (status, _, body) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert!(!error_message(&body).is_empty());
    }
}

#[tokio::test]
async fn test_malformed_envelope_is_400() {
    let app = app();

    for body in [
        &br#"{"type":"main","dataType":"BlockAdded","id":1}"#[..],
        &b"[1,2,3]"[..],
        &b"not json"[..],
        &b""[..],
    ] {
        let (status, _, response) = send(&app, post_event(body.to_vec())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", String::from_utf8_lossy(body));
        assert!(!error_message(&response).is_empty());
    }
}

#[tokio::test]
async fn test_oversized_event_is_413() {
    let event = br#"{"type":"main","source":"http://node","dataType":"Step"}"#;
    let limit = event.len() - 1;
    let app = router(
        EventAuditService::new(Arc::new(InMemoryBlobStore::new())).with_max_event_size(limit),
    );

    // One byte over the limit reaches the service
    let (status, headers, body) = send(&app, post_event(event.to_vec())).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    assert!(error_message(&body).contains(&limit.to_string()));

    // Far over the limit is cut off by the body limit, with the same error shape
    let (status, headers, body) = send(&app, post_event(MAIN_EVENT)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    assert!(error_message(&body).contains("length limit exceeded"));
}

#[tokio::test]
async fn test_persistent_store_over_http() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = ServerConfig::default();
    config.storage.data_dir = temp_dir.path().to_path_buf();

    let app = router(open_service(&config).await.unwrap());

    let (status, _, body) = send(&app, post_event(MAIN_EVENT)).await;
    assert_eq!(status, StatusCode::OK);
    let id = String::from_utf8(body.to_vec()).unwrap();

    let (status, headers, body) = send(&app, get(&format!("/events/audit/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_LENGTH], "1163");
    assert_eq!(&body[..], MAIN_EVENT);
}
