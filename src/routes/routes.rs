//! Defines routes for the probe and the file API.
//!
//! ## Structure
//! - **Probe** (any method, validated in the handler)
//!   - `/healthz`, mirrored at `/cicd`
//!
//! - **File collection** `/{v1,v2}/file`
//!   - `POST` — upload; `GET DELETE HEAD OPTIONS PATCH PUT` — 400
//!
//! - **File item** `/{v1,v2}/file/{id}`
//!   - `GET` — read; `DELETE` — delete; `HEAD OPTIONS PATCH PUT POST` — 405
//!
//! v1 and v2 are identical aliases.

use crate::{
    handlers::{
        file_handlers::{
            collection_bad_request, delete_file, get_file, item_method_not_allowed, upload_file,
        },
        probe_handlers::healthz,
    },
    middleware::request_metrics::track_requests,
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{any, get, post},
};

pub const PROBE_PATHS: [&str; 2] = ["/healthz", "/cicd"];
pub const API_VERSIONS: [&str; 2] = ["v1", "v2"];

/// Build the router with every route, still awaiting its state.
pub fn routes() -> Router<AppState> {
    let mut router = Router::new();

    for path in PROBE_PATHS {
        router = router.route(path, any(healthz));
    }

    for version in API_VERSIONS {
        router = router
            .route(
                &format!("/{}/file", version),
                post(upload_file)
                    .get(collection_bad_request)
                    .delete(collection_bad_request)
                    .head(collection_bad_request)
                    .options(collection_bad_request)
                    .patch(collection_bad_request)
                    .put(collection_bad_request),
            )
            .route(
                &format!("/{}/file/{{id}}", version),
                get(get_file)
                    .delete(delete_file)
                    .head(item_method_not_allowed)
                    .options(item_method_not_allowed)
                    .patch(item_method_not_allowed)
                    .put(item_method_not_allowed)
                    .post(item_method_not_allowed),
            );
    }

    router.layer(middleware::from_fn(track_requests))
}

/// The complete application: routes, upload size limit and state.
pub fn app(state: AppState, max_upload_bytes: usize) -> Router {
    routes()
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db,
        services::{local_store::LocalBlobStore, metadata_store::SqliteMetadataStore},
    };
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use metrics::{
        Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit,
    };
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Keeps the `route` label of every `http.requests` counter.
    #[derive(Default)]
    struct RouteLabels(Mutex<Vec<String>>);

    impl Recorder for RouteLabels {
        fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

        fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
            if key.name() == "http.requests" {
                if let Some(label) = key.labels().find(|l| l.key() == "route") {
                    self.0.lock().unwrap().push(label.value().to_string());
                }
            }
            Counter::noop()
        }

        fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
            Gauge::noop()
        }

        fn register_histogram(&self, _: &Key, _: &Metadata<'_>) -> Histogram {
            Histogram::noop()
        }
    }

    #[tokio::test]
    async fn unknown_paths_are_still_tracked() {
        let dir = TempDir::new().unwrap();
        let pool = db::connect_in_memory().await.unwrap();
        db::run_migrations(&pool).await.unwrap();
        let state = AppState::new(
            Arc::new(LocalBlobStore::new(dir.path(), "bucket")),
            Arc::new(SqliteMetadataStore::new(Arc::new(pool))),
        );
        let server = TestServer::new(app(state, 1024)).unwrap();

        let recorder = RouteLabels::default();
        let _guard = metrics::set_default_local_recorder(&recorder);

        server.get("/healthz").await.assert_status(StatusCode::OK);
        server
            .get("/no-such-path")
            .await
            .assert_status(StatusCode::NOT_FOUND);

        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec!["/healthz".to_string(), "unmatched".to_string()]
        );
    }
}
