//! Liveness probe validation.
//!
//! The probe accepts exactly one request shape: a parameter-free, body-free
//! `GET`. [`classify`] checks the request in a fixed order and the first
//! failing check decides the rejection. An accepted probe then writes one
//! liveness event; the write outcome decides between 200 and 503.

use crate::services::metadata_store::MetadataStore;
use axum::http::{Method, StatusCode};
use std::sync::Arc;
use tracing::{error, info, warn};

/// The only `Content-Type` value a probe may carry.
pub const ALLOWED_CONTENT_TYPE: &str = "application/json";

/// The parts of an inbound request the probe looks at.
#[derive(Debug, Clone, Copy)]
pub struct ProbeRequest<'a> {
    pub method: &'a Method,
    pub query: Option<&'a str>,
    pub content_type: Option<&'a [u8]>,
    pub body: &'a [u8],
}

/// Why a probe request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    HeadMethod,
    UnsupportedMethod,
    QueryParams,
    ContentType,
    Payload,
}

impl Rejection {
    pub fn status(self) -> StatusCode {
        match self {
            Rejection::HeadMethod | Rejection::UnsupportedMethod => {
                StatusCode::METHOD_NOT_ALLOWED
            }
            Rejection::QueryParams | Rejection::ContentType | Rejection::Payload => {
                StatusCode::BAD_REQUEST
            }
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            Rejection::HeadMethod => "head_method",
            Rejection::UnsupportedMethod => "unsupported_method",
            Rejection::QueryParams => "query_params",
            Rejection::ContentType => "content_type",
            Rejection::Payload => "payload",
        }
    }
}

/// Final result of a probe, after validation and the liveness write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Healthy,
    Rejected(Rejection),
    StoreUnavailable,
}

impl ProbeOutcome {
    pub fn status(self) -> StatusCode {
        match self {
            ProbeOutcome::Healthy => StatusCode::OK,
            ProbeOutcome::Rejected(r) => r.status(),
            ProbeOutcome::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            ProbeOutcome::Healthy => "ok",
            ProbeOutcome::Rejected(r) => r.reason(),
            ProbeOutcome::StoreUnavailable => "store_unavailable",
        }
    }
}

/// Validate the request shape. `Ok(())` means the probe may proceed.
pub fn classify(req: &ProbeRequest<'_>) -> Result<(), Rejection> {
    if *req.method == Method::HEAD {
        return Err(Rejection::HeadMethod);
    }
    if *req.method != Method::GET {
        return Err(Rejection::UnsupportedMethod);
    }
    if req.query.is_some_and(|q| !q.is_empty()) {
        return Err(Rejection::QueryParams);
    }
    if req
        .content_type
        .is_some_and(|ct| ct != ALLOWED_CONTENT_TYPE.as_bytes())
    {
        return Err(Rejection::ContentType);
    }
    if body_has_content(req.body) {
        return Err(Rejection::Payload);
    }
    Ok(())
}

/// A body counts as empty when it is blank or an empty JSON object/array.
fn body_has_content(body: &[u8]) -> bool {
    if body.trim_ascii().is_empty() {
        return false;
    }
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => !map.is_empty(),
        Ok(serde_json::Value::Array(items)) => !items.is_empty(),
        _ => true,
    }
}

#[derive(Clone)]
pub struct ProbeService {
    meta: Arc<dyn MetadataStore>,
}

impl ProbeService {
    pub fn new(meta: Arc<dyn MetadataStore>) -> Self {
        Self { meta }
    }

    /// Validate, then record a liveness event.
    pub async fn check(&self, req: &ProbeRequest<'_>) -> ProbeOutcome {
        let outcome = match classify(req) {
            Err(rejection) => {
                warn!(
                    method = %req.method,
                    reason = rejection.reason(),
                    "liveness probe rejected"
                );
                ProbeOutcome::Rejected(rejection)
            }
            Ok(()) => match self.meta.record_liveness().await {
                Ok(event) => {
                    info!(check_id = event.check_id, "liveness probe succeeded");
                    ProbeOutcome::Healthy
                }
                Err(err) => {
                    error!(error = %err, "liveness probe could not reach metadata store");
                    ProbeOutcome::StoreUnavailable
                }
            },
        };

        metrics::counter!("probe.decisions", "reason" => outcome.reason()).increment(1);
        outcome
    }
}
