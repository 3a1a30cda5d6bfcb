//! HTTP routes
//!
//! - POST /events/audit - store the request body, respond with the storage id
//! - GET /events/audit/{id} - stream the stored event back
//! - GET /events/audit/{id}/metadata - registration details of a stored event
//! - GET /health - health check

use audit_storage::{AuditError, BlobRecord, EventAuditService, JSON_CONTENT_TYPE};
use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, Path, State, rejection::BytesRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tokio_util::io::ReaderStream;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// A failed request rendered as an HTTP response
#[derive(Debug)]
pub enum ApiError {
    /// The service rejected or failed the operation
    Audit(AuditError),
    /// The request body could not be read (e.g. over the body limit)
    Body(BytesRejection),
}

impl From<AuditError> for ApiError {
    fn from(err: AuditError) -> Self {
        Self::Audit(err)
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        Self::Body(rejection)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Audit(AuditError::MalformedEnvelope(_)) => StatusCode::BAD_REQUEST,
            ApiError::Audit(AuditError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Audit(AuditError::PayloadTooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Audit(AuditError::Storage(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Body(rejection) => rejection.status(),
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Audit(err) => err.to_string(),
            ApiError::Body(rejection) => rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.message();
        if status.is_server_error() {
            error!(status = status.as_u16(), %error, "Request failed");
        } else {
            warn!(status = status.as_u16(), %error, "Request rejected");
        }

        (status, Json(ErrorResponse { error })).into_response()
    }
}

/// Build the router for `service`
///
/// Request bodies are capped one byte above the service limit, so an event
/// just over the limit still reaches the service. Larger bodies are cut off
/// while buffering; both answer 413 with the same JSON error body.
pub fn router(service: EventAuditService) -> Router {
    let body_limit = service.max_event_size().saturating_add(1);

    Router::new()
        .route("/health", get(health))
        .route("/events/audit", post(save_event))
        .route("/events/audit/{id}", get(read_event))
        .route("/events/audit/{id}/metadata", get(describe_event))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn save_event(
    State(service): State<EventAuditService>,
    body: Result<Bytes, BytesRejection>,
) -> Result<String, ApiError> {
    let id = service.save_bytes(body?).await?;
    Ok(id.to_string())
}

async fn read_event(
    State(service): State<EventAuditService>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let stream = service.read(&id).await?;
    let length = stream.length();

    let headers = [
        (header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE)),
        (header::CONTENT_LENGTH, HeaderValue::from(length)),
    ];
    Ok((headers, Body::from_stream(ReaderStream::new(stream))).into_response())
}

async fn describe_event(
    State(service): State<EventAuditService>,
    Path(id): Path<String>,
) -> Result<Json<BlobRecord>, ApiError> {
    Ok(Json(service.describe(&id).await?))
}
