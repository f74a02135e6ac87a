//! Liveness probe handler.
//!
//! - GET /healthz (and the /cicd alias) -> 200 with an empty body when a
//!   liveness event was written, 503 when the metadata store is unreachable.
//!
//! Every other request shape is rejected with 400 or 405. All responses,
//! including rejections, carry the no-cache headers.

use crate::{services::probe::ProbeRequest, state::AppState};
use axum::{
    body::{Body, to_bytes},
    extract::State,
    http::{HeaderMap, HeaderName, Method, Uri, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;

/// Anything larger is rejected as a payload without reading further.
const PROBE_BODY_LIMIT: usize = 64 * 1024;

/// Headers that keep every probe response out of intermediary caches.
pub fn no_cache_headers() -> [(HeaderName, &'static str); 3] {
    [
        (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
        (header::PRAGMA, "no-cache"),
        (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    ]
}

/// `ANY /healthz`
pub async fn healthz(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Body,
) -> Response {
    // An unreadable or oversized body is still a body.
    let body = to_bytes(body, PROBE_BODY_LIMIT)
        .await
        .unwrap_or_else(|_| Bytes::from_static(b"\0"));

    let req = ProbeRequest {
        method: &method,
        query: uri.query(),
        content_type: headers.get(header::CONTENT_TYPE).map(|v| v.as_bytes()),
        body: &body,
    };

    let outcome = state.probe.check(&req).await;
    (outcome.status(), no_cache_headers()).into_response()
}
