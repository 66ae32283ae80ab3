//! crates/api-adapters/src/middleware.rs Middleware
//!
//! Tracing, request ids, compression, CORS and error accounting.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::{header, Method};
use axum::middleware::Next;
use axum::response::Response;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{HttpMakeClassifier, TraceLayer};

use crate::metrics::Metrics;

/// Tags every request with an `x-request-id`, keeping one the client sent.
pub fn set_request_id() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

/// Echoes the request id on the response.
pub fn propagate_request_id() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}

/// One span per request: method, uri, status and latency.
pub fn trace_layer() -> TraceLayer<HttpMakeClassifier> {
    TraceLayer::new_for_http()
}

/// Gzip for JSON bodies. Event streams are left alone by the default predicate.
pub fn compression_layer() -> CompressionLayer {
    CompressionLayer::new()
}

/// Configures CORS (Cross-Origin Resource Sharing).
/// Needed when the board UI is served from a different origin than the API.
pub fn cors_policy(permissive: bool) -> CorsLayer {
    if !permissive {
        return CorsLayer::new();
    }
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600))
}

/// Counts failed responses by kind.
pub async fn track_errors(
    State(metrics): State<Arc<Metrics>>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    let status = response.status();
    if status.is_client_error() {
        metrics.record_error("validation");
    } else if status.is_server_error() {
        metrics.record_error("store");
    }
    response
}
