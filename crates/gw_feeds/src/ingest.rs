use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{info, warn};

use gw_core::{
    source_domain, ArticleStore, FeedItem, FeedSource, NewArticle, PipelineStage, Result,
};

use crate::client::FeedClient;

/// Items taken from each feed per run. Feeds are otherwise ingested
/// whole; diversity is applied at read time, not here.
const MAX_ITEMS_PER_FEED: usize = 25;

/// Normalizes and deduplicates feed entries into the article store.
/// A failing feed is logged and skipped; the remaining sources are
/// still processed.
pub struct IngestStage {
    store: Arc<dyn ArticleStore>,
    client: Arc<dyn FeedClient>,
    sources: Vec<FeedSource>,
}

impl IngestStage {
    pub fn new(
        store: Arc<dyn ArticleStore>,
        client: Arc<dyn FeedClient>,
        sources: Vec<FeedSource>,
    ) -> Self {
        Self {
            store,
            client,
            sources,
        }
    }

    async fn ingest_items(&self, source: &FeedSource, items: Vec<FeedItem>) -> Result<u64> {
        let mut inserted = 0;
        for item in items.into_iter().take(MAX_ITEMS_PER_FEED) {
            let domain = source_domain(&item.link)
                .or_else(|| source_domain(&source.url))
                .unwrap_or_else(|| source.name.clone());

            let article = NewArticle {
                title: item.title,
                url: item.link,
                category: source.category_or_default().to_string(),
                source_name: source.name.clone(),
                source_url: source.url.clone(),
                source_domain: domain,
                published_at: item.published,
            };

            // false = URL already stored; duplicates are expected, not errors
            if self.store.insert_article(&article).await? {
                inserted += 1;
            }
        }
        Ok(inserted)
    }
}

#[async_trait]
impl PipelineStage for IngestStage {
    fn name(&self) -> &'static str {
        "ingest"
    }

    async fn run(&self) -> Result<u64> {
        let fetches = self
            .sources
            .iter()
            .map(|source| async move { (source, self.client.fetch(source).await) });
        let results = join_all(fetches).await;

        let mut inserted = 0;
        for (source, result) in results {
            match result {
                Ok(items) => inserted += self.ingest_items(source, items).await?,
                Err(e) if e.is_timeout() => {
                    warn!(feed = %source.name, "feed fetch timed out");
                }
                Err(e) => {
                    warn!(feed = %source.name, error = %e, "feed failed");
                }
            }
        }

        info!(inserted, "ingest done");
        Ok(inserted)
    }
}
