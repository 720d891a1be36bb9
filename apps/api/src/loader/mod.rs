//! Tiered content loader.
//!
//! Resolves a resource kind (`profile`, `targets`, `posts`) to a normalized
//! [`ContentDocument`] by trying sources in a fixed priority order:
//!
//! 1. remote store (raced against [`REMOTE_TIMEOUT`])
//! 2. HTTP API (`/api/<kind>`)
//! 3. static snapshot (`/data/<kind>.json`)
//!
//! A failing tier is logged and skipped. Only when every tier in the plan has
//! failed does the caller see an error, [`LoadError::AllTiersExhausted`].
//! Tiers never overlap: the remote tier's timeout is resolved (and its future
//! dropped) before the API tier starts.

pub mod http;
pub mod loading;
pub mod normalize;
pub mod remote;
pub mod session;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::ContentDocument;
use loading::LoadingBus;

/// How long the remote store gets before the loader moves on.
pub const REMOTE_TIMEOUT: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Profile,
    Targets,
    Posts,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::Profile,
        ResourceKind::Targets,
        ResourceKind::Posts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Profile => "profile",
            ResourceKind::Targets => "targets",
            ResourceKind::Posts => "posts",
        }
    }

    /// Path of the REST endpoint serving this kind.
    pub fn api_path(&self) -> String {
        format!("/api/{}", self.as_str())
    }

    /// Path of the pre-generated snapshot for this kind.
    pub fn static_path(&self) -> String {
        format!("/data/{}.json", self.as_str())
    }

    pub fn file_name(&self) -> String {
        format!("{}.json", self.as_str())
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "profile" => Ok(ResourceKind::Profile),
            "targets" => Ok(ResourceKind::Targets),
            "posts" => Ok(ResourceKind::Posts),
            other => Err(format!("unknown resource kind '{other}'")),
        }
    }
}

/// One candidate source in the priority chain. Ordering is priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Remote,
    Api,
    Static,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tier::Remote => "remote",
            Tier::Api => "api",
            Tier::Static => "static",
        })
    }
}

/// Why a single tier attempt failed. Recovered locally by the loader.
#[derive(Debug, Error)]
pub enum TierError {
    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("expected a {expected} document, got {got}")]
    WrongKind {
        expected: ResourceKind,
        got: ResourceKind,
    },
}

impl From<reqwest::Error> for TierError {
    fn from(e: reqwest::Error) -> Self {
        TierError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for TierError {
    fn from(e: serde_json::Error) -> Self {
        TierError::Transport(format!("invalid JSON: {e}"))
    }
}

impl From<sqlx::Error> for TierError {
    fn from(e: sqlx::Error) -> Self {
        TierError::Transport(format!("database: {e}"))
    }
}

impl From<std::io::Error> for TierError {
    fn from(e: std::io::Error) -> Self {
        TierError::Transport(e.to_string())
    }
}

#[derive(Debug)]
pub struct TierFailure {
    pub tier: Tier,
    pub error: TierError,
}

/// The only error a caller of [`Loader::load`] ever sees.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not load {kind}: {}", hint(.remote_failed))]
    AllTiersExhausted {
        kind: ResourceKind,
        remote_failed: bool,
        failures: Vec<TierFailure>,
    },
}

impl LoadError {
    fn wrong_kind(expected: ResourceKind, tier: Tier, got: ResourceKind) -> Self {
        LoadError::AllTiersExhausted {
            kind: expected,
            remote_failed: tier == Tier::Remote,
            failures: vec![TierFailure {
                tier,
                error: TierError::WrongKind { expected, got },
            }],
        }
    }

    /// Human-readable hint suitable for the rendered error state.
    pub fn hint(&self) -> &'static str {
        match self {
            LoadError::AllTiersExhausted { remote_failed, .. } => hint(remote_failed),
        }
    }
}

fn hint(remote_failed: &bool) -> &'static str {
    if *remote_failed {
        "the remote store failed and the API and static fallbacks failed as well"
    } else {
        "no data was found in the API or the static snapshot"
    }
}

/// A successfully loaded document and the tier that produced it.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub kind: ResourceKind,
    pub tier: Tier,
    pub document: ContentDocument,
}

/// A single tier. Implementations make exactly one attempt per call.
#[async_trait]
pub trait ContentSource: Send + Sync {
    fn tier(&self) -> Tier;

    async fn fetch(&self, kind: ResourceKind) -> Result<ContentDocument, TierError>;
}

/// Runs one attempt, racing the remote tier against [`REMOTE_TIMEOUT`].
///
/// On timeout the source's future is dropped, which cancels whatever request
/// it had in flight.
async fn attempt(
    source: &dyn ContentSource,
    kind: ResourceKind,
) -> Result<ContentDocument, TierError> {
    match source.tier() {
        Tier::Remote => tokio::time::timeout(REMOTE_TIMEOUT, source.fetch(kind))
            .await
            .map_err(|_| TierError::Timeout(REMOTE_TIMEOUT))?,
        Tier::Api | Tier::Static => source.fetch(kind).await,
    }
}

/// Folds an ordered list of sources into the first success.
///
/// Each failure is recorded and the next source is tried. Sources are awaited
/// one at a time, never concurrently.
pub async fn first_success(
    kind: ResourceKind,
    sources: &[&dyn ContentSource],
) -> Result<Loaded, LoadError> {
    let mut failures = Vec::new();

    for source in sources {
        let tier = source.tier();
        let result = attempt(*source, kind).await.and_then(|document| {
            if document.kind() == kind {
                Ok(document)
            } else {
                Err(TierError::WrongKind {
                    expected: kind,
                    got: document.kind(),
                })
            }
        });
        match result {
            Ok(document) => {
                debug!("{kind} loaded from {tier} tier");
                return Ok(Loaded {
                    kind,
                    tier,
                    document,
                });
            }
            Err(error) => {
                debug!("{kind}: {tier} tier failed ({error}), falling through");
                failures.push(TierFailure { tier, error });
            }
        }
    }

    let remote_failed = failures.iter().any(|f| f.tier == Tier::Remote);
    Err(LoadError::AllTiersExhausted {
        kind,
        remote_failed,
        failures,
    })
}

/// Decodes a JSON body from the API or static tier into the document for `kind`.
pub fn decode_document(kind: ResourceKind, body: Value) -> Result<ContentDocument, TierError> {
    let document = match kind {
        ResourceKind::Profile => {
            let mut profile: crate::models::Profile = serde_json::from_value(body)?;
            profile.ensure_ids();
            ContentDocument::Profile(profile)
        }
        ResourceKind::Targets => ContentDocument::Targets(serde_json::from_value(body)?),
        ResourceKind::Posts => ContentDocument::Posts(serde_json::from_value(body)?),
    };
    Ok(document)
}

/// The composed loader: an ordered set of sources, per-kind tier plans, and
/// the loading-state bus.
#[derive(Clone)]
pub struct Loader {
    sources: Vec<Arc<dyn ContentSource>>,
    skipped: HashMap<ResourceKind, Vec<Tier>>,
    bus: Arc<LoadingBus>,
}

impl Loader {
    pub fn new(bus: Arc<LoadingBus>) -> Self {
        Self {
            sources: Vec::new(),
            skipped: HashMap::new(),
            bus,
        }
    }

    /// Adds a source. Sources are kept sorted by tier, so the order of calls
    /// does not change the priority order.
    pub fn with_source(mut self, source: Arc<dyn ContentSource>) -> Self {
        self.sources.push(source);
        self.sources.sort_by_key(|s| s.tier());
        self
    }

    /// Leaves `tier` out of the plan for `kind`.
    pub fn without_tier(mut self, kind: ResourceKind, tier: Tier) -> Self {
        self.skipped.entry(kind).or_default().push(tier);
        self
    }

    /// The tiers that will be tried for `kind`, in order.
    pub fn plan(&self, kind: ResourceKind) -> Vec<Tier> {
        self.plan_sources(kind).iter().map(|s| s.tier()).collect()
    }

    fn plan_sources(&self, kind: ResourceKind) -> Vec<&dyn ContentSource> {
        let skipped = self.skipped.get(&kind);
        self.sources
            .iter()
            .filter(|s| skipped.map_or(true, |tiers| !tiers.contains(&s.tier())))
            .map(|s| s.as_ref())
            .collect()
    }

    /// Loads `kind` fresh from the highest-priority tier that succeeds.
    pub async fn load(&self, kind: ResourceKind) -> Result<Loaded, LoadError> {
        let _loading = self.bus.begin(kind);
        let sources = self.plan_sources(kind);

        let result = first_success(kind, &sources).await;
        match &result {
            Ok(loaded) => info!("{} served from {} tier", loaded.kind, loaded.tier),
            Err(e) => {
                let LoadError::AllTiersExhausted { failures, .. } = e;
                for failure in failures {
                    warn!("{kind}: {} tier: {}", failure.tier, failure.error);
                }
                warn!("{e}");
            }
        }
        result
    }

    pub async fn load_profile(&self) -> Result<(Tier, crate::models::Profile), LoadError> {
        let loaded = self.load(ResourceKind::Profile).await?;
        let (tier, got) = (loaded.tier, loaded.document.kind());
        let Some(profile) = loaded.document.into_profile() else {
            return Err(LoadError::wrong_kind(ResourceKind::Profile, tier, got));
        };
        Ok((tier, profile))
    }

    pub async fn load_targets(&self) -> Result<(Tier, crate::models::TargetList), LoadError> {
        let loaded = self.load(ResourceKind::Targets).await?;
        let (tier, got) = (loaded.tier, loaded.document.kind());
        let Some(targets) = loaded.document.into_targets() else {
            return Err(LoadError::wrong_kind(ResourceKind::Targets, tier, got));
        };
        Ok((tier, targets))
    }

    pub async fn load_posts(&self) -> Result<(Tier, crate::models::PostList), LoadError> {
        let loaded = self.load(ResourceKind::Posts).await?;
        let (tier, got) = (loaded.tier, loaded.document.kind());
        let Some(posts) = loaded.document.into_posts() else {
            return Err(LoadError::wrong_kind(ResourceKind::Posts, tier, got));
        };
        Ok((tier, posts))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted sources for exercising the fold without any network.

    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::models::{PostList, Profile, TargetList};

    pub enum Script {
        Succeed,
        Fail,
        Delay(Duration),
        Hang,
        /// Answers with a document of some other kind.
        WrongKind,
    }

    pub struct ScriptedSource {
        pub tier: Tier,
        pub script: Script,
        pub calls: AtomicUsize,
        pub label: &'static str,
    }

    impl ScriptedSource {
        pub fn new(tier: Tier, script: Script, label: &'static str) -> Arc<Self> {
            Arc::new(Self {
                tier,
                script,
                calls: AtomicUsize::new(0),
                label,
            })
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    pub fn labelled(kind: ResourceKind, label: &str) -> ContentDocument {
        match kind {
            ResourceKind::Profile => ContentDocument::Profile(Profile {
                summary: label.to_string(),
                ..Default::default()
            }),
            ResourceKind::Targets => ContentDocument::Targets(TargetList::default()),
            ResourceKind::Posts => ContentDocument::Posts(PostList::default()),
        }
    }

    #[async_trait]
    impl ContentSource for ScriptedSource {
        fn tier(&self) -> Tier {
            self.tier
        }

        async fn fetch(&self, kind: ResourceKind) -> Result<ContentDocument, TierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.script {
                Script::Succeed => Ok(labelled(kind, self.label)),
                Script::Fail => Err(TierError::Transport(format!("{} failed", self.label))),
                Script::Delay(d) => {
                    tokio::time::sleep(d).await;
                    Ok(labelled(kind, self.label))
                }
                Script::Hang => {
                    std::future::pending::<()>().await;
                    unreachable!()
                }
                Script::WrongKind => {
                    let other = match kind {
                        ResourceKind::Posts => ResourceKind::Profile,
                        _ => ResourceKind::Posts,
                    };
                    Ok(labelled(other, self.label))
                }
            }
        }
    }
}
