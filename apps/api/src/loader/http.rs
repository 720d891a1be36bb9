//! HTTP API tier and static snapshot tier.

use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::header::CACHE_CONTROL;
use reqwest::{Client, Url};
use serde_json::Value;
use tracing::debug;

use super::{decode_document, ContentSource, ResourceKind, Tier, TierError};
use crate::models::ContentDocument;

/// Picks the base URL of the REST tier.
///
/// An explicit override wins. Otherwise a site served from `localhost` or
/// `127.0.0.1` talks to the local API on `local_port`, and anything else uses
/// its own origin.
pub fn resolve_api_base_url(
    override_url: Option<&str>,
    site_origin: &str,
    local_port: u16,
) -> String {
    if let Some(url) = override_url.map(str::trim).filter(|u| !u.is_empty()) {
        return url.trim_end_matches('/').to_string();
    }

    let is_localhost = Url::parse(site_origin)
        .ok()
        .and_then(|u| u.host_str().map(|h| h == "localhost" || h == "127.0.0.1"))
        .unwrap_or(false);
    if is_localhost {
        return format!("http://localhost:{local_port}");
    }

    site_origin.trim_end_matches('/').to_string()
}

/// GETs `url` as JSON. Any non-2xx status is a failure; the body of an error
/// response is never parsed as data.
pub async fn fetch_json_or_fail(client: &Client, url: &str) -> Result<Value, TierError> {
    let response = client
        .get(url)
        .header(CACHE_CONTROL, "no-cache")
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(TierError::Http {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let body = response.json::<Value>().await?;
    debug!("fetched {url} ({status})");
    Ok(body)
}

/// Tier 2: the REST API at `<base>/api/<kind>`.
pub struct ApiSource {
    client: Client,
    base_url: String,
}

impl ApiSource {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn url_for(&self, kind: ResourceKind) -> String {
        format!("{}{}", self.base_url, kind.api_path())
    }
}

#[async_trait]
impl ContentSource for ApiSource {
    fn tier(&self) -> Tier {
        Tier::Api
    }

    async fn fetch(&self, kind: ResourceKind) -> Result<ContentDocument, TierError> {
        let body = fetch_json_or_fail(&self.client, &self.url_for(kind)).await?;
        decode_document(kind, body)
    }
}

/// Where the pre-generated `<kind>.json` snapshots live.
#[derive(Debug, Clone)]
pub enum SnapshotLocation {
    /// Served by the site itself under `/data/`.
    Origin(String),
    /// A local directory holding `<kind>.json` files.
    Directory(PathBuf),
}

/// Tier 3: the static snapshot bundled with the site build.
pub struct StaticSource {
    client: Client,
    location: SnapshotLocation,
}

impl StaticSource {
    pub fn new(client: Client, location: SnapshotLocation) -> Self {
        Self { client, location }
    }
}

#[async_trait]
impl ContentSource for StaticSource {
    fn tier(&self) -> Tier {
        Tier::Static
    }

    async fn fetch(&self, kind: ResourceKind) -> Result<ContentDocument, TierError> {
        let body = match &self.location {
            SnapshotLocation::Origin(origin) => {
                let url = format!("{}{}", origin.trim_end_matches('/'), kind.static_path());
                fetch_json_or_fail(&self.client, &url).await?
            }
            SnapshotLocation::Directory(dir) => {
                let path = dir.join(kind.file_name());
                let bytes = tokio::fs::read(&path).await.map_err(|e| {
                    TierError::Transport(format!("{}: {e}", path.display()))
                })?;
                serde_json::from_slice(&bytes)?
            }
        };
        decode_document(kind, body)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::{http::StatusCode, routing::get, Json, Router};
    use serde_json::json;

    use super::*;
    use crate::loader::loading::LoadingBus;
    use crate::loader::testing::{Script, ScriptedSource};
    use crate::loader::Loader;

    /// Serves `router` on an ephemeral local port and returns its origin.
    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn test_base_url_override_wins_and_is_trimmed() {
        assert_eq!(
            resolve_api_base_url(
                Some(" https://api.example.com/ "),
                "http://localhost:5173",
                8080
            ),
            "https://api.example.com"
        );
    }

    #[test]
    fn test_base_url_localhost_uses_local_port() {
        assert_eq!(
            resolve_api_base_url(None, "http://localhost:5173", 8080),
            "http://localhost:8080"
        );
        assert_eq!(
            resolve_api_base_url(Some("  "), "http://127.0.0.1:3000", 9090),
            "http://localhost:9090"
        );
    }

    #[test]
    fn test_base_url_falls_back_to_origin() {
        assert_eq!(
            resolve_api_base_url(None, "https://me.github.io/", 8080),
            "https://me.github.io"
        );
    }

    #[tokio::test]
    async fn test_api_source_reads_targets() {
        let origin = spawn(Router::new().route(
            "/api/targets",
            get(|| async {
                Json(json!({ "targets": [{ "id": "t1", "company": "Acme", "priorityTags": ["rust"] }] }))
            }),
        ))
        .await;

        let doc = ApiSource::new(Client::new(), origin)
            .fetch(ResourceKind::Targets)
            .await
            .unwrap();
        let targets = doc.into_targets().unwrap();
        assert_eq!(targets.targets[0].priority_tags, vec!["rust"]);
    }

    #[tokio::test]
    async fn test_api_404_falls_through_to_static() {
        let static_hits = Arc::new(AtomicUsize::new(0));
        let hits = static_hits.clone();
        let origin = spawn(
            Router::new()
                .route(
                    "/api/profile",
                    get(|| async {
                        (StatusCode::NOT_FOUND, Json(json!({ "summary": "not data" })))
                    }),
                )
                .route(
                    "/data/profile.json",
                    get(move || {
                        hits.fetch_add(1, Ordering::SeqCst);
                        async { Json(json!({ "summary": "from snapshot" })) }
                    }),
                ),
        )
        .await;

        let client = Client::new();
        let loader = Loader::new(Arc::new(LoadingBus::new()))
            .with_source(Arc::new(ApiSource::new(client.clone(), origin.clone())))
            .with_source(Arc::new(StaticSource::new(
                client,
                SnapshotLocation::Origin(origin),
            )));

        let loaded = loader.load(ResourceKind::Profile).await.unwrap();
        assert_eq!(loaded.tier, Tier::Static);
        assert_eq!(loaded.document.into_profile().unwrap().summary, "from snapshot");
        assert_eq!(static_hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_api_non_success_is_http_error() {
        let origin = spawn(Router::new().route(
            "/api/posts",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        ))
        .await;

        let err = ApiSource::new(Client::new(), origin)
            .fetch(ResourceKind::Posts)
            .await
            .unwrap_err();
        assert!(matches!(err, TierError::Http { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_unreachable_api_is_transport_error() {
        // Bind then drop to get a port with nothing listening.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = ApiSource::new(Client::new(), format!("http://{addr}"))
            .fetch(ResourceKind::Profile)
            .await
            .unwrap_err();
        assert!(matches!(err, TierError::Transport(_)));
    }

    #[tokio::test]
    async fn test_static_directory_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("posts.json"),
            r#"{ "posts": [{ "slug": "hello", "title": "Hello", "href": "/blog/hello.html" }] }"#,
        )
        .unwrap();

        let source = StaticSource::new(
            Client::new(),
            SnapshotLocation::Directory(dir.path().to_path_buf()),
        );
        let posts = source
            .fetch(ResourceKind::Posts)
            .await
            .unwrap()
            .into_posts()
            .unwrap();
        assert_eq!(posts.posts[0].href, "/blog/hello.html");

        let missing = source.fetch(ResourceKind::Targets).await.unwrap_err();
        assert!(matches!(missing, TierError::Transport(_)));
    }

    #[tokio::test]
    async fn test_remote_failure_then_api_success() {
        let origin = spawn(Router::new().route(
            "/api/posts",
            get(|| async { Json(json!({ "posts": [{ "slug": "a" }] })) }),
        ))
        .await;
        let remote = ScriptedSource::new(Tier::Remote, Script::Fail, "remote");

        let loader = Loader::new(Arc::new(LoadingBus::new()))
            .with_source(remote.clone())
            .with_source(Arc::new(ApiSource::new(Client::new(), origin)));

        let (tier, posts) = loader.load_posts().await.unwrap();
        assert_eq!(tier, Tier::Api);
        assert_eq!(posts.posts.len(), 1);
        assert_eq!(remote.calls(), 1);
    }
}
