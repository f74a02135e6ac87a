use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::{env, str::FromStr};

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Which blob store backs the file API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackend {
    Local,
    S3,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "s3" => Ok(Self::S3),
            other => anyhow::bail!("unknown storage backend `{}` (expected local or s3)", other),
        }
    }
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub storage_backend: StorageBackend,
    pub storage_dir: String,
    pub bucket: String,
    pub region: String,
    pub s3_endpoint: Option<String>,
    pub max_upload_bytes: usize,
    pub metrics_port: Option<u16>,
    pub log_json: bool,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "File ingestion API with a strict liveness probe")]
pub struct Args {
    /// Host to bind to (overrides FILE_VAULT_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides FILE_VAULT_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides FILE_VAULT_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Blob store backend (overrides FILE_VAULT_STORAGE_BACKEND)
    #[arg(long, value_enum)]
    pub storage_backend: Option<StorageBackend>,

    /// Directory for the local backend (overrides FILE_VAULT_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Bucket name (overrides FILE_VAULT_BUCKET)
    #[arg(long)]
    pub bucket: Option<String>,

    /// S3 region (overrides FILE_VAULT_REGION)
    #[arg(long)]
    pub region: Option<String>,

    /// Custom S3 endpoint, e.g. MinIO (overrides FILE_VAULT_S3_ENDPOINT)
    #[arg(long)]
    pub s3_endpoint: Option<String>,

    /// Upload size limit in bytes (overrides FILE_VAULT_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,

    /// Serve Prometheus metrics on this port (overrides FILE_VAULT_METRICS_PORT)
    #[arg(long)]
    pub metrics_port: Option<u16>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let migrate = args.migrate;
        Ok((Self::merge(args, |key| env::var(key))?, migrate))
    }

    /// CLI value, else environment value, else default.
    fn merge<F>(args: Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|_| default.into());

        let cfg = Self {
            host: args
                .host
                .unwrap_or_else(|| text("FILE_VAULT_HOST", "0.0.0.0")),
            port: match args.port {
                Some(port) => port,
                None => parse_var(&lookup, "FILE_VAULT_PORT")?.unwrap_or(8080),
            },
            database_url: args.database_url.unwrap_or_else(|| {
                text(
                    "FILE_VAULT_DATABASE_URL",
                    "sqlite://./data/meta/file_vault.db",
                )
            }),
            storage_backend: match args.storage_backend {
                Some(backend) => backend,
                None => parse_var(&lookup, "FILE_VAULT_STORAGE_BACKEND")?
                    .unwrap_or(StorageBackend::Local),
            },
            storage_dir: args
                .storage_dir
                .unwrap_or_else(|| text("FILE_VAULT_STORAGE_DIR", "./data/objects")),
            bucket: args
                .bucket
                .unwrap_or_else(|| text("FILE_VAULT_BUCKET", "file-vault")),
            region: args
                .region
                .unwrap_or_else(|| text("FILE_VAULT_REGION", "us-east-1")),
            s3_endpoint: args
                .s3_endpoint
                .or_else(|| lookup("FILE_VAULT_S3_ENDPOINT").ok()),
            max_upload_bytes: match args.max_upload_bytes {
                Some(limit) => limit,
                None => parse_var(&lookup, "FILE_VAULT_MAX_UPLOAD_BYTES")?
                    .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            },
            metrics_port: match args.metrics_port {
                Some(port) => Some(port),
                None => parse_var(&lookup, "FILE_VAULT_METRICS_PORT")?,
            },
            log_json: parse_var(&lookup, "FILE_VAULT_LOG_JSON")?.unwrap_or(false),
        };

        Ok(cfg)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parse an optional environment variable, reporting the offending value.
fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Result<String, env::VarError>,
{
    match lookup(key) {
        Ok(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("parsing {} value `{}`", key, value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err).with_context(|| format!("reading {}", key)),
    }
}
