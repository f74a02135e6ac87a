use anyhow::{Context, Result};
use file_vault::{
    config::{AppConfig, StorageBackend},
    db, routes,
    services::{
        blob_store::BlobStore, local_store::LocalBlobStore, metadata_store::SqliteMetadataStore,
        s3_store::S3BlobStore,
    },
    state::AppState,
    telemetry,
};
use std::{io::ErrorKind, sync::Arc};
use tokio::{net::TcpListener, signal};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Parse config + migrate flag ---
    let (cfg, migrate) = AppConfig::from_env_and_args()?;

    // --- Logging + metrics setup ---
    telemetry::init_tracing("info", cfg.log_json);
    if let Some(port) = cfg.metrics_port {
        telemetry::init_metrics(port)?;
    }

    tracing::info!("Starting file-vault with config: {:?}", cfg);

    // --- Initialize SQLite + schema ---
    let db = Arc::new(db::connect(&cfg.database_url).await?);
    db::run_migrations(&db).await?;
    if migrate {
        tracing::info!("Database migration complete.");
        return Ok(());
    }

    // --- Initialize collaborators ---
    let blobs: Arc<dyn BlobStore> = match cfg.storage_backend {
        StorageBackend::Local => {
            let store = LocalBlobStore::new(&cfg.storage_dir, &cfg.bucket);
            store
                .ensure_root()
                .await
                .with_context(|| format!("preparing storage directory {}", cfg.storage_dir))?;
            tracing::info!("Using local blob store at {}", cfg.storage_dir);
            Arc::new(store)
        }
        StorageBackend::S3 => {
            let store = S3BlobStore::new(
                cfg.bucket.clone(),
                cfg.region.clone(),
                cfg.s3_endpoint.clone(),
            )
            .context("configuring S3 blob store")?;
            tracing::info!(bucket = %cfg.bucket, region = %cfg.region, "Using S3 blob store");
            Arc::new(store)
        }
    };
    let meta = Arc::new(SqliteMetadataStore::new(db.clone()));

    // --- Build router ---
    let app = routes::routes::app(AppState::new(blobs, meta), cfg.max_upload_bytes);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    tracing::info!("Server stopped");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        _ = terminate => tracing::info!("Received SIGTERM signal"),
    }
}
