use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::{Article, NewArticle};
use crate::Result;

/// Ordered, queryable article store.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Insert a new article. Returns `false` when the URL is already
    /// stored; duplicates are skipped, never overwritten.
    async fn insert_article(&self, article: &NewArticle) -> Result<bool>;

    /// Up to `limit` articles without commentary, newest ingested first.
    async fn unsummarized(&self, limit: u32) -> Result<Vec<Article>>;

    /// Attach commentary to an article, stamping the commentary
    /// timestamp. Fails if the article is missing or already has
    /// commentary; a record is summarized at most once.
    async fn set_summary(&self, id: i64, summary: &str, at: DateTime<Utc>) -> Result<()>;

    /// Articles with non-empty commentary, ordered by most recent
    /// available timestamp descending.
    async fn summarized_page(&self, limit: u32, offset: u32) -> Result<Vec<Article>>;

    /// Count of articles with non-empty commentary.
    async fn summarized_count(&self) -> Result<u64>;

    /// Fetch one article by id.
    async fn get(&self, id: i64) -> Result<Option<Article>>;
}
