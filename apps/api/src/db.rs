use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::sync::OnceCell;
use tracing::info;

use crate::loader::remote::{
    CompanyRow, ItemRow, PostRow, RemoteStore, SiteProfileRow, TargetRow, SITE_PROFILE_KEY,
};
use crate::loader::TierError;

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// The hosted content store, backed by PostgreSQL.
///
/// The pool is created on first use and shared afterwards; concurrent first
/// callers wait on the same connection attempt. A failed attempt leaves the
/// cell empty so the next load tries again.
pub struct PgRemoteStore {
    database_url: Option<String>,
    pool: OnceCell<PgPool>,
}

impl PgRemoteStore {
    pub fn new(database_url: Option<String>) -> Self {
        Self {
            database_url: database_url.filter(|u| !u.trim().is_empty()),
            pool: OnceCell::new(),
        }
    }

    async fn pool(&self) -> Result<&PgPool, TierError> {
        let url = self
            .database_url
            .as_deref()
            .ok_or_else(|| TierError::Unavailable("DATABASE_URL is not set".to_string()))?;
        let pool = self.pool.get_or_try_init(|| create_pool(url)).await?;
        Ok(pool)
    }
}

// Array columns go through to_jsonb so NULL, text[] and jsonb all decode the
// same way; normalization deals with whatever shape comes back.
const SITE_PROFILE_SQL: &str = r#"
    SELECT name, title, email, phone, location, to_jsonb(links) AS links,
           summary, intro, to_jsonb(achievements) AS achievements,
           to_jsonb(skills) AS skills, to_jsonb(education) AS education,
           to_jsonb(trainings) AS trainings
    FROM site_profile
    WHERE key = $1
"#;

const COMPANIES_SQL: &str = r#"
    SELECT id::text AS id, name, role, period, summary, icon_image, icon_text
    FROM companies
    ORDER BY sort_order ASC, name ASC
"#;

const PROJECTS_SQL: &str = r#"
    SELECT id::text AS id, company_id::text AS company_id, name, period, role,
           summary, impact, to_jsonb(tags) AS tags, to_jsonb(details) AS details,
           to_jsonb(tech) AS tech
    FROM projects
    WHERE company_id::text = ANY($1)
    ORDER BY sort_order ASC, name ASC
"#;

// Initiatives carry no role column.
const INITIATIVES_SQL: &str = r#"
    SELECT id::text AS id, company_id::text AS company_id, name, period,
           NULL::text AS role, summary, impact, to_jsonb(tags) AS tags,
           to_jsonb(details) AS details, to_jsonb(tech) AS tech
    FROM initiatives
    WHERE company_id::text = ANY($1)
    ORDER BY sort_order ASC, name ASC
"#;

const TARGETS_SQL: &str = r#"
    SELECT id::text AS id, company, role, to_jsonb(priority_tags) AS priority_tags,
           summary_hint
    FROM targets
    ORDER BY sort_order ASC
"#;

const POSTS_SQL: &str = r#"
    SELECT id::text AS id, slug, title, excerpt, category,
           published_at::text AS published_at
    FROM posts
    WHERE published OR $1
    ORDER BY published_at DESC, created_at DESC
"#;

#[async_trait]
impl RemoteStore for PgRemoteStore {
    fn is_ready(&self) -> bool {
        self.database_url.is_some()
    }

    async fn site_profile(&self) -> Result<Option<SiteProfileRow>, TierError> {
        let row = sqlx::query_as::<_, SiteProfileRow>(SITE_PROFILE_SQL)
            .bind(SITE_PROFILE_KEY)
            .fetch_optional(self.pool().await?)
            .await?;
        Ok(row)
    }

    async fn companies(&self) -> Result<Vec<CompanyRow>, TierError> {
        let rows = sqlx::query_as::<_, CompanyRow>(COMPANIES_SQL)
            .fetch_all(self.pool().await?)
            .await?;
        Ok(rows)
    }

    async fn projects(&self, company_ids: &[String]) -> Result<Vec<ItemRow>, TierError> {
        let rows = sqlx::query_as::<_, ItemRow>(PROJECTS_SQL)
            .bind(company_ids)
            .fetch_all(self.pool().await?)
            .await?;
        Ok(rows)
    }

    async fn initiatives(&self, company_ids: &[String]) -> Result<Vec<ItemRow>, TierError> {
        let rows = sqlx::query_as::<_, ItemRow>(INITIATIVES_SQL)
            .bind(company_ids)
            .fetch_all(self.pool().await?)
            .await?;
        Ok(rows)
    }

    async fn targets(&self) -> Result<Vec<TargetRow>, TierError> {
        let rows = sqlx::query_as::<_, TargetRow>(TARGETS_SQL)
            .fetch_all(self.pool().await?)
            .await?;
        Ok(rows)
    }

    async fn posts(&self, include_drafts: bool) -> Result<Vec<PostRow>, TierError> {
        let rows = sqlx::query_as::<_, PostRow>(POSTS_SQL)
            .bind(include_drafts)
            .fetch_all(self.pool().await?)
            .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_database_url_is_not_ready() {
        assert!(!PgRemoteStore::new(None).is_ready());
        assert!(!PgRemoteStore::new(Some("  ".into())).is_ready());
        assert!(PgRemoteStore::new(Some("postgres://localhost/site".into())).is_ready());
    }

    #[tokio::test]
    async fn test_query_without_url_is_unavailable() {
        let err = PgRemoteStore::new(None).companies().await.unwrap_err();
        assert!(matches!(err, TierError::Unavailable(_)));
    }
}
