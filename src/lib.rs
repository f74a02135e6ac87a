//! file-vault: file ingestion over a blob store plus a metadata store, and a
//! strict liveness probe.

pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;
