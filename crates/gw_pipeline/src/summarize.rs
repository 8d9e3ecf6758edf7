use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use gw_core::{ArticleStore, CommentaryModel, PipelineStage, Result};

use crate::quota::QuotaTracker;

/// Attaches commentary to ingested articles, newest first, gated by the
/// daily quota. Quota is spent only on success; a failing commentary
/// call skips the article and moves on.
pub struct SummarizeStage {
    store: Arc<dyn ArticleStore>,
    model: Arc<dyn CommentaryModel>,
    quota: Arc<QuotaTracker>,
    batch_limit: u32,
    daily_cap: u32,
    cooldown: Duration,
}

impl SummarizeStage {
    pub fn new(
        store: Arc<dyn ArticleStore>,
        model: Arc<dyn CommentaryModel>,
        quota: Arc<QuotaTracker>,
        batch_limit: u32,
        daily_cap: u32,
        cooldown: Duration,
    ) -> Self {
        Self {
            store,
            model,
            quota,
            batch_limit,
            daily_cap,
            cooldown,
        }
    }
}

#[async_trait]
impl PipelineStage for SummarizeStage {
    fn name(&self) -> &'static str {
        "summarize"
    }

    async fn run(&self) -> Result<u64> {
        let state = self.quota.state()?;
        info!(used = state.count, cap = self.daily_cap, "daily commentary quota");

        if !self.quota.can_consume(self.daily_cap)? {
            info!("daily cap reached, skipping summarize");
            return Ok(0);
        }

        let batch = self.store.unsummarized(self.batch_limit).await?;
        if batch.is_empty() {
            info!("no articles awaiting commentary");
            return Ok(0);
        }

        let mut done = 0u64;
        for article in batch {
            // the cap can be hit mid-batch; stop, don't skip ahead
            if !self.quota.can_consume(self.daily_cap)? {
                info!("daily cap reached mid-batch, stopping");
                break;
            }

            debug!(title = %article.title, "requesting commentary");
            match self.model.commentary(&article.title, &article.url).await {
                Ok(text) => {
                    self.store.set_summary(article.id, &text, Utc::now()).await?;
                    self.quota.record_use()?;
                    done += 1;
                }
                Err(e) => {
                    warn!(title = %article.title, error = %e, "commentary failed, skipping");
                }
            }

            if !self.cooldown.is_zero() {
                tokio::time::sleep(self.cooldown).await;
            }
        }

        info!(done, "summarize done");
        Ok(done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw_core::{Error, NewArticle};
    use gw_inference::DummyModel;
    use gw_storage::MemoryStore;
    use tempfile::tempdir;

    fn new_article(n: u32) -> NewArticle {
        NewArticle {
            title: format!("Story {n}"),
            url: format!("https://example.com/{n}"),
            category: "world".to_string(),
            source_name: "Test Wire".to_string(),
            source_url: "https://example.com/feed".to_string(),
            source_domain: "example.com".to_string(),
            published_at: None,
        }
    }

    async fn seed(store: &MemoryStore, count: u32) {
        for n in 0..count {
            store.insert_article(&new_article(n)).await.unwrap();
        }
    }

    fn stage(
        store: Arc<MemoryStore>,
        model: Arc<dyn CommentaryModel>,
        quota: Arc<QuotaTracker>,
        batch_limit: u32,
        daily_cap: u32,
    ) -> SummarizeStage {
        SummarizeStage::new(store, model, quota, batch_limit, daily_cap, Duration::ZERO)
    }

    #[tokio::test]
    async fn cap_stops_the_batch_mid_way() {
        let dir = tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let quota = Arc::new(QuotaTracker::new(dir.path().join("quota.json")));
        seed(&store, 3).await;

        let stage = stage(store.clone(), Arc::new(DummyModel), quota.clone(), 10, 2);
        assert_eq!(stage.run().await.unwrap(), 2);

        // exactly one article is left without commentary
        assert_eq!(store.unsummarized(10).await.unwrap().len(), 1);
        assert_eq!(store.summarized_count().await.unwrap(), 2);
        assert_eq!(quota.state().unwrap().count, 2);
    }

    #[tokio::test]
    async fn exhausted_quota_touches_nothing() {
        let dir = tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let quota = Arc::new(QuotaTracker::new(dir.path().join("quota.json")));
        seed(&store, 2).await;

        quota.record_use().unwrap();
        quota.record_use().unwrap();

        let stage = stage(store.clone(), Arc::new(DummyModel), quota.clone(), 10, 2);
        assert_eq!(stage.run().await.unwrap(), 0);
        assert_eq!(store.unsummarized(10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn summarized_articles_are_never_reselected() {
        let dir = tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let quota = Arc::new(QuotaTracker::new(dir.path().join("quota.json")));
        seed(&store, 2).await;

        let stage = stage(store.clone(), Arc::new(DummyModel), quota.clone(), 10, 100);
        assert_eq!(stage.run().await.unwrap(), 2);
        // a second run finds nothing to do and spends nothing
        assert_eq!(stage.run().await.unwrap(), 0);
        assert_eq!(quota.state().unwrap().count, 2);
    }

    #[tokio::test]
    async fn empty_store_is_a_no_op() {
        let dir = tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let quota = Arc::new(QuotaTracker::new(dir.path().join("quota.json")));

        let stage = stage(store, Arc::new(DummyModel), quota, 10, 100);
        assert_eq!(stage.run().await.unwrap(), 0);
    }

    struct FlakyModel;

    #[async_trait]
    impl CommentaryModel for FlakyModel {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn commentary(&self, title: &str, url: &str) -> Result<String> {
            if title.contains("1") {
                Err(Error::Inference("vendor hiccup".to_string()))
            } else {
                DummyModel.commentary(title, url).await
            }
        }
    }

    #[tokio::test]
    async fn failed_commentary_spends_no_quota() {
        let dir = tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let quota = Arc::new(QuotaTracker::new(dir.path().join("quota.json")));
        seed(&store, 3).await; // "Story 1" will fail

        let stage = stage(store.clone(), Arc::new(FlakyModel), quota.clone(), 10, 100);
        assert_eq!(stage.run().await.unwrap(), 2);

        assert_eq!(store.summarized_count().await.unwrap(), 2);
        assert_eq!(quota.state().unwrap().count, 2);

        let pending = store.unsummarized(10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert!(pending[0].title.contains("1"));
    }

    #[tokio::test]
    async fn batch_limit_bounds_one_run() {
        let dir = tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let quota = Arc::new(QuotaTracker::new(dir.path().join("quota.json")));
        seed(&store, 5).await;

        let stage = stage(store.clone(), Arc::new(DummyModel), quota, 2, 100);
        assert_eq!(stage.run().await.unwrap(), 2);
        assert_eq!(store.unsummarized(10).await.unwrap().len(), 3);
    }
}
