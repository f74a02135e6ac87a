//! Per-request logging and metrics.
//!
//! Logs `Incoming`/`Completed` lines for every request and records a request
//! counter plus a latency histogram labelled by method, route template and
//! status. Requests that match no route are labelled `unmatched`. Metrics macros
//! are no-ops until a recorder is installed.

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use metrics::Label;
use std::time::Instant;
use tracing::info;

pub async fn track_requests(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());

    info!("Incoming {} {}", method, uri);

    let response = next.run(req).await;

    let elapsed = start.elapsed();
    let status = response.status().as_u16();
    info!(
        method = %method,
        route = %route,
        status,
        duration_ms = elapsed.as_secs_f64() * 1000.0,
        "Completed {} {} with status {} in {}ms",
        method,
        uri,
        status,
        elapsed.as_millis()
    );

    let labels = vec![
        Label::new("method", method.to_string()),
        Label::new("route", route),
        Label::new("status", status.to_string()),
    ];
    metrics::counter!("http.requests", labels.clone()).increment(1);
    metrics::histogram!("http.request.duration_seconds", labels).record(elapsed.as_secs_f64());

    response
}
