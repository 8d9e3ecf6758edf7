use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category applied when a feed source does not declare one.
pub const DEFAULT_CATEGORY: &str = "news";

/// One aggregated item. Identity is the canonical `url`; duplicate URLs
/// are skipped at insert, never overwritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub category: String,
    pub source_name: String,
    pub source_url: String,
    pub source_domain: String,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub summary: Option<String>,
    pub summarized_at: Option<DateTime<Utc>>,
}

impl Article {
    /// Most recent timestamp available, used for display ordering.
    pub fn display_at(&self) -> DateTime<Utc> {
        self.summarized_at.unwrap_or(self.created_at)
    }

    pub fn has_summary(&self) -> bool {
        self.summary.as_deref().map_or(false, |s| !s.is_empty())
    }
}

/// Insert payload for the ingest stage. The store assigns `id` and
/// `created_at`; `created_at` is set once and never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewArticle {
    pub title: String,
    pub url: String,
    pub category: String,
    pub source_name: String,
    pub source_url: String,
    pub source_domain: String,
    pub published_at: Option<DateTime<Utc>>,
}

/// A configured upstream feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
    pub category: Option<String>,
}

impl FeedSource {
    pub fn new(name: &str, url: &str, category: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            category: Some(category.to_string()),
        }
    }

    pub fn category_or_default(&self) -> &str {
        self.category.as_deref().unwrap_or(DEFAULT_CATEGORY)
    }
}

/// One parsed feed entry, before normalization into a `NewArticle`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub published: Option<DateTime<Utc>>,
}

/// Host of a URL with any leading `www.` stripped.
pub fn source_domain(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_string())
}
