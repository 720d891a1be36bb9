//! Remote structured store tier.
//!
//! The store is an injected capability: the composition root decides whether a
//! [`RemoteStore`] exists and the store itself reports readiness without
//! touching the network.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::FromRow;
use tracing::debug;

use super::normalize::{assemble_profile, posts_from_rows, targets_from_rows};
use super::session::{SessionSource, WriterPolicy};
use super::{ContentSource, ResourceKind, Tier, TierError};
use crate::models::ContentDocument;

/// Key of the singleton `site_profile` row.
pub const SITE_PROFILE_KEY: &str = "default";

#[derive(Debug, Clone, Default, FromRow)]
pub struct SiteProfileRow {
    pub name: Option<String>,
    pub title: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub links: Option<Value>,
    pub summary: Option<String>,
    pub intro: Option<String>,
    pub achievements: Option<Value>,
    pub skills: Option<Value>,
    pub education: Option<Value>,
    pub trainings: Option<Value>,
}

#[derive(Debug, Clone, Default, FromRow)]
pub struct CompanyRow {
    pub id: String,
    pub name: Option<String>,
    pub role: Option<String>,
    pub period: Option<String>,
    pub summary: Option<String>,
    pub icon_image: Option<String>,
    pub icon_text: Option<String>,
}

/// A `projects` or `initiatives` row.
#[derive(Debug, Clone, Default, FromRow)]
pub struct ItemRow {
    pub id: String,
    pub company_id: String,
    pub name: Option<String>,
    pub period: Option<String>,
    pub role: Option<String>,
    pub summary: Option<String>,
    pub impact: Option<String>,
    pub tags: Option<Value>,
    pub details: Option<Value>,
    pub tech: Option<Value>,
}

#[derive(Debug, Clone, Default, FromRow)]
pub struct TargetRow {
    pub id: String,
    pub company: Option<String>,
    pub role: Option<String>,
    pub priority_tags: Option<Value>,
    pub summary_hint: Option<String>,
}

#[derive(Debug, Clone, Default, FromRow)]
pub struct PostRow {
    pub id: String,
    pub slug: Option<String>,
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub category: Option<String>,
    pub published_at: Option<String>,
}

/// Queries against the hosted store. Every list is ordered by the table's
/// `sort_order` column, then by name.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Whether a client can be built at all. Never performs I/O.
    fn is_ready(&self) -> bool;

    async fn site_profile(&self) -> Result<Option<SiteProfileRow>, TierError>;

    async fn companies(&self) -> Result<Vec<CompanyRow>, TierError>;

    async fn projects(&self, company_ids: &[String]) -> Result<Vec<ItemRow>, TierError>;

    async fn initiatives(&self, company_ids: &[String]) -> Result<Vec<ItemRow>, TierError>;

    async fn targets(&self) -> Result<Vec<TargetRow>, TierError>;

    /// Newest first. Drafts are included only when `include_drafts` is set.
    async fn posts(&self, include_drafts: bool) -> Result<Vec<PostRow>, TierError>;
}

/// Tier 1: assembles documents from the remote store.
pub struct RemoteSource {
    store: Arc<dyn RemoteStore>,
    sessions: Arc<dyn SessionSource>,
    writer: WriterPolicy,
}

impl RemoteSource {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        sessions: Arc<dyn SessionSource>,
        writer: WriterPolicy,
    ) -> Self {
        Self {
            store,
            sessions,
            writer,
        }
    }

    async fn is_writer(&self) -> bool {
        let session = self.sessions.current().await;
        self.writer.is_writer(session.as_ref())
    }

    async fn profile(&self) -> Result<ContentDocument, TierError> {
        let profile = self
            .store
            .site_profile()
            .await?
            .ok_or_else(|| TierError::Unavailable("site_profile is empty".to_string()))?;

        let companies = self.store.companies().await?;
        let company_ids: Vec<String> = companies.iter().map(|c| c.id.clone()).collect();

        let (projects, initiatives) = if company_ids.is_empty() {
            (Vec::new(), Vec::new())
        } else {
            (
                self.store.projects(&company_ids).await?,
                self.store.initiatives(&company_ids).await?,
            )
        };

        debug!(
            "remote profile: {} companies, {} projects, {} initiatives",
            companies.len(),
            projects.len(),
            initiatives.len()
        );
        Ok(ContentDocument::Profile(assemble_profile(
            profile,
            companies,
            projects,
            initiatives,
        )))
    }

    async fn targets(&self) -> Result<ContentDocument, TierError> {
        if !self.is_writer().await {
            return Err(TierError::Unavailable(
                "targets are readable by the writer only".to_string(),
            ));
        }
        let rows = self.store.targets().await?;
        Ok(ContentDocument::Targets(targets_from_rows(rows)))
    }

    async fn posts(&self) -> Result<ContentDocument, TierError> {
        let include_drafts = self.is_writer().await;
        let rows = self.store.posts(include_drafts).await?;
        Ok(ContentDocument::Posts(posts_from_rows(rows)))
    }
}

#[async_trait]
impl ContentSource for RemoteSource {
    fn tier(&self) -> Tier {
        Tier::Remote
    }

    async fn fetch(&self, kind: ResourceKind) -> Result<ContentDocument, TierError> {
        if !self.store.is_ready() {
            return Err(TierError::Unavailable(
                "remote store is not configured".to_string(),
            ));
        }
        match kind {
            ResourceKind::Profile => self.profile().await,
            ResourceKind::Targets => self.targets().await,
            ResourceKind::Posts => self.posts().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::loader::loading::LoadingBus;
    use crate::loader::session::{FixedSession, Session};
    use crate::loader::testing::{Script, ScriptedSource};
    use crate::loader::Loader;

    /// In-memory store that counts queries.
    #[derive(Default)]
    pub struct FakeStore {
        pub ready: bool,
        pub profile: Option<SiteProfileRow>,
        pub companies: Vec<CompanyRow>,
        pub projects: Vec<ItemRow>,
        pub targets: Vec<TargetRow>,
        pub posts: Vec<PostRow>,
        pub queries: AtomicUsize,
        pub drafts_requested: Mutex<Option<bool>>,
    }

    impl FakeStore {
        fn count(&self) {
            self.queries.fetch_add(1, Ordering::SeqCst);
        }

        pub fn queries(&self) -> usize {
            self.queries.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RemoteStore for FakeStore {
        fn is_ready(&self) -> bool {
            self.ready
        }

        async fn site_profile(&self) -> Result<Option<SiteProfileRow>, TierError> {
            self.count();
            Ok(self.profile.clone())
        }

        async fn companies(&self) -> Result<Vec<CompanyRow>, TierError> {
            self.count();
            Ok(self.companies.clone())
        }

        async fn projects(&self, company_ids: &[String]) -> Result<Vec<ItemRow>, TierError> {
            self.count();
            Ok(self
                .projects
                .iter()
                .filter(|p| company_ids.contains(&p.company_id))
                .cloned()
                .collect())
        }

        async fn initiatives(&self, _company_ids: &[String]) -> Result<Vec<ItemRow>, TierError> {
            self.count();
            Ok(Vec::new())
        }

        async fn targets(&self) -> Result<Vec<TargetRow>, TierError> {
            self.count();
            Ok(self.targets.clone())
        }

        async fn posts(&self, include_drafts: bool) -> Result<Vec<PostRow>, TierError> {
            self.count();
            *self.drafts_requested.lock().unwrap() = Some(include_drafts);
            Ok(self.posts.clone())
        }
    }

    fn source(store: Arc<FakeStore>, email: Option<&str>) -> RemoteSource {
        RemoteSource::new(
            store,
            Arc::new(FixedSession(email.map(Session::for_email))),
            WriterPolicy::new("owner@example.com"),
        )
    }

    #[tokio::test]
    async fn test_unready_store_fails_without_queries() {
        let store = Arc::new(FakeStore::default());
        let err = source(store.clone(), None)
            .fetch(ResourceKind::Profile)
            .await
            .unwrap_err();
        assert!(matches!(err, TierError::Unavailable(_)));
        assert_eq!(store.queries(), 0);
    }

    #[tokio::test]
    async fn test_missing_site_profile_is_a_failure() {
        let store = Arc::new(FakeStore {
            ready: true,
            ..Default::default()
        });
        let err = source(store, None)
            .fetch(ResourceKind::Profile)
            .await
            .unwrap_err();
        assert!(matches!(err, TierError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_no_companies_skips_item_queries() {
        let store = Arc::new(FakeStore {
            ready: true,
            profile: Some(SiteProfileRow::default()),
            ..Default::default()
        });
        let doc = source(store.clone(), None)
            .fetch(ResourceKind::Profile)
            .await
            .unwrap();
        assert!(doc.into_profile().unwrap().companies.is_empty());
        assert_eq!(store.queries(), 2);
    }

    #[tokio::test]
    async fn test_profile_assembles_companies_and_projects() {
        let store = Arc::new(FakeStore {
            ready: true,
            profile: Some(SiteProfileRow {
                name: Some("Kim".into()),
                ..Default::default()
            }),
            companies: vec![CompanyRow {
                id: "c1".into(),
                icon_image: Some("logo/유니크굿.jpg".into()),
                ..Default::default()
            }],
            projects: vec![ItemRow {
                id: "p1".into(),
                company_id: "c1".into(),
                tags: Some(Value::Null),
                ..Default::default()
            }],
            ..Default::default()
        });

        let profile = source(store.clone(), None)
            .fetch(ResourceKind::Profile)
            .await
            .unwrap()
            .into_profile()
            .unwrap();

        let company = &profile.companies[0];
        assert_eq!(company.icon_image.as_deref(), Some("logo/unique-good.jpg"));
        assert_eq!(company.projects[0].tags, Vec::<String>::new());
        assert_eq!(store.queries(), 4);
    }

    #[tokio::test]
    async fn test_non_writer_targets_never_query_store() {
        let store = Arc::new(FakeStore {
            ready: true,
            ..Default::default()
        });
        let api = ScriptedSource::new(Tier::Api, Script::Succeed, "api");
        let loader = Loader::new(Arc::new(LoadingBus::new()))
            .with_source(Arc::new(source(store.clone(), Some("guest@example.com"))))
            .with_source(api.clone());

        let loaded = loader.load(ResourceKind::Targets).await.unwrap();

        assert_eq!(loaded.tier, Tier::Api);
        assert_eq!(api.calls(), 1);
        assert_eq!(store.queries(), 0);
    }

    #[tokio::test]
    async fn test_writer_reads_targets() {
        let store = Arc::new(FakeStore {
            ready: true,
            targets: vec![TargetRow {
                id: "t1".into(),
                company: Some("Acme".into()),
                priority_tags: Some(json!(["rust", "infra"])),
                ..Default::default()
            }],
            ..Default::default()
        });

        let targets = source(store, Some("OWNER@example.com"))
            .fetch(ResourceKind::Targets)
            .await
            .unwrap()
            .into_targets()
            .unwrap();

        assert_eq!(targets.targets[0].priority_tags, vec!["rust", "infra"]);
    }

    #[tokio::test]
    async fn test_posts_include_drafts_only_for_writer() {
        let store = Arc::new(FakeStore {
            ready: true,
            ..Default::default()
        });

        source(store.clone(), None)
            .fetch(ResourceKind::Posts)
            .await
            .unwrap();
        assert_eq!(*store.drafts_requested.lock().unwrap(), Some(false));

        source(store.clone(), Some("owner@example.com"))
            .fetch(ResourceKind::Posts)
            .await
            .unwrap();
        assert_eq!(*store.drafts_requested.lock().unwrap(), Some(true));
    }
}
