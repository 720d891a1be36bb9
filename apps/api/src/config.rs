use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::loader::http::resolve_api_base_url;

/// Application configuration loaded from environment variables.
/// Everything has a default except the remote store and the writer address,
/// which simply stay disabled when unset.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Directory the REST layer reads `<kind>.json` from before falling back
    /// to the snapshots compiled into the binary.
    pub data_dir: PathBuf,
    pub database_url: Option<String>,
    pub writer_email: String,
    /// E-mail of the session the loader runs as, if any.
    pub session_email: Option<String>,
    pub api_base_url: String,
    pub site_origin: String,
    /// Local snapshot directory for the static tier. When unset the static
    /// tier fetches `/data/<kind>.json` from `site_origin`.
    pub static_data_dir: Option<PathBuf>,
    pub cors_allowed_origin: String,
    pub http_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let port = env_or("PORT", "8080")
            .parse::<u16>()
            .context("PORT must be a valid port number")?;
        let site_origin = optional_env("SITE_ORIGIN")
            .unwrap_or_else(|| format!("http://localhost:{port}"));
        let api_base_url =
            resolve_api_base_url(optional_env("API_BASE_URL").as_deref(), &site_origin, port);

        Ok(Config {
            port,
            rust_log: env_or("RUST_LOG", "info"),
            data_dir: PathBuf::from(env_or("DATA_DIR", "data")),
            database_url: optional_env("DATABASE_URL"),
            writer_email: optional_env("WRITER_EMAIL").unwrap_or_default(),
            session_email: optional_env("FOLIO_SESSION_EMAIL"),
            api_base_url,
            site_origin,
            static_data_dir: optional_env("STATIC_DATA_DIR").map(PathBuf::from),
            cors_allowed_origin: env_or("CORS_ALLOWED_ORIGIN", "http://localhost:5173"),
            http_timeout_secs: env_or("HTTP_TIMEOUT_SECS", "10")
                .parse::<u64>()
                .context("HTTP_TIMEOUT_SECS must be a whole number of seconds")?,
        })
    }
}

/// Reads `key`, treating unset and blank values alike.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    optional_env(key).unwrap_or_else(|| default.to_string())
}
