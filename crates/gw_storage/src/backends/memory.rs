use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use gw_core::{Article, ArticleStore, Error, NewArticle, Result};

/// In-memory store for tests and ephemeral runs. Mirrors the sqlite
/// backend's semantics: unique URLs, at-most-once summaries, newest-first
/// ordering.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    articles: Vec<Article>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn insert_article(&self, article: &NewArticle) -> Result<bool> {
        let mut inner = self.lock();
        if inner.articles.iter().any(|a| a.url == article.url) {
            return Ok(false);
        }
        inner.next_id += 1;
        let id = inner.next_id;
        inner.articles.push(Article {
            id,
            title: article.title.clone(),
            url: article.url.clone(),
            category: article.category.clone(),
            source_name: article.source_name.clone(),
            source_url: article.source_url.clone(),
            source_domain: article.source_domain.clone(),
            published_at: article.published_at,
            created_at: Utc::now(),
            summary: None,
            summarized_at: None,
        });
        Ok(true)
    }

    async fn unsummarized(&self, limit: u32) -> Result<Vec<Article>> {
        let inner = self.lock();
        let mut pending: Vec<Article> = inner
            .articles
            .iter()
            .filter(|a| !a.has_summary())
            .cloned()
            .collect();
        pending.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        pending.truncate(limit as usize);
        Ok(pending)
    }

    async fn set_summary(&self, id: i64, summary: &str, at: DateTime<Utc>) -> Result<()> {
        let mut inner = self.lock();
        let article = inner
            .articles
            .iter_mut()
            .find(|a| a.id == id && !a.has_summary())
            .ok_or_else(|| Error::Storage(format!("article {id} missing or already summarized")))?;
        article.summary = Some(summary.to_string());
        article.summarized_at = Some(at);
        Ok(())
    }

    async fn summarized_page(&self, limit: u32, offset: u32) -> Result<Vec<Article>> {
        let inner = self.lock();
        let mut done: Vec<Article> = inner
            .articles
            .iter()
            .filter(|a| a.has_summary())
            .cloned()
            .collect();
        done.sort_by(|a, b| (b.display_at(), b.id).cmp(&(a.display_at(), a.id)));
        Ok(done
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn summarized_count(&self) -> Result<u64> {
        let inner = self.lock();
        Ok(inner.articles.iter().filter(|a| a.has_summary()).count() as u64)
    }

    async fn get(&self, id: i64) -> Result<Option<Article>> {
        let inner = self.lock();
        Ok(inner.articles.iter().find(|a| a.id == id).cloned())
    }
}
