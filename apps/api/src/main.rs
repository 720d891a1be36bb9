mod builder;
mod config;
mod content;
mod db;
mod errors;
mod loader;
mod models;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Method};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::content::ContentRepository;
use crate::db::PgRemoteStore;
use crate::loader::http::{ApiSource, SnapshotLocation, StaticSource};
use crate::loader::loading::LoadingBus;
use crate::loader::remote::{RemoteSource, RemoteStore};
use crate::loader::session::{FixedSession, Session, WriterPolicy};
use crate::loader::{Loader, ResourceKind};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting folio API v{}", env!("CARGO_PKG_VERSION"));

    if config.writer_email.is_empty() {
        warn!("WRITER_EMAIL is not set; targets will never be read from the remote store");
    }

    let loading = Arc::new(LoadingBus::new());
    loading.spawn_event_log();
    let loader = build_loader(&config, loading.clone())?;

    let state = AppState {
        content: Arc::new(ContentRepository::new(config.data_dir.clone())),
        loader,
        loading,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors(&config)?);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Wires the three tiers. The remote store is always registered; it reports
/// itself unready when no database is configured.
fn build_loader(config: &Config, loading: Arc<LoadingBus>) -> Result<Loader> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()
        .context("failed to build HTTP client")?;

    let store: Arc<dyn RemoteStore> = Arc::new(PgRemoteStore::new(config.database_url.clone()));
    if store.is_ready() {
        info!("Remote store configured");
    } else {
        info!("Remote store not configured; loading from API and static snapshots");
    }

    let session = config.session_email.clone().map(Session::for_email);
    let remote = RemoteSource::new(
        store,
        Arc::new(FixedSession(session)),
        WriterPolicy::new(config.writer_email.clone()),
    );

    let snapshots = match &config.static_data_dir {
        Some(dir) => SnapshotLocation::Directory(dir.clone()),
        None => SnapshotLocation::Origin(config.site_origin.clone()),
    };
    info!("API tier: {}, static tier: {snapshots:?}", config.api_base_url);

    let loader = Loader::new(loading)
        .with_source(Arc::new(remote))
        .with_source(Arc::new(ApiSource::new(
            client.clone(),
            config.api_base_url.clone(),
        )))
        .with_source(Arc::new(StaticSource::new(client, snapshots)));

    for kind in ResourceKind::ALL {
        info!("{kind} tier plan: {:?}", loader.plan(kind));
    }
    Ok(loader)
}

fn build_cors(config: &Config) -> Result<CorsLayer> {
    let origin = HeaderValue::from_str(&config.cors_allowed_origin)
        .context("CORS_ALLOWED_ORIGIN is not a valid header value")?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::CACHE_CONTROL])
        .allow_credentials(false))
}
