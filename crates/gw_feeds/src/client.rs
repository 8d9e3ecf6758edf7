use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use gw_core::{Error, FeedItem, FeedSource, Result};

const USER_AGENT: &str = concat!("grimwire/", env!("CARGO_PKG_VERSION"));
const ACCEPT: &str = "application/rss+xml, application/xml;q=0.9, */*;q=0.8";

/// Feed fetching collaborator. The ingest stage only sees parsed items,
/// so tests can script feeds without a network.
#[async_trait]
pub trait FeedClient: Send + Sync {
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<FeedItem>>;
}

pub struct HttpFeedClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFeedClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl FeedClient for HttpFeedClient {
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<FeedItem>> {
        let response = self
            .client
            .get(&source.url)
            .timeout(self.timeout)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .send()
            .await
            .map_err(|e| classify(&source.url, e))?;

        if !response.status().is_success() {
            return Err(Error::Feed(format!(
                "{}: HTTP {}",
                source.name,
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| classify(&source.url, e))?;
        let feed = feed_rs::parser::parse(bytes.as_ref())
            .map_err(|e| Error::Feed(format!("{}: parse failed: {e}", source.name)))?;

        let items: Vec<FeedItem> = feed
            .entries
            .into_iter()
            .filter_map(|entry| {
                let title = entry.title.map(|t| t.content.trim().to_string())?;
                let link = entry.links.first().map(|l| l.href.trim().to_string())?;
                if title.is_empty() || link.is_empty() {
                    return None;
                }
                Some(FeedItem {
                    title,
                    link,
                    published: entry.published.or(entry.updated),
                })
            })
            .collect();

        debug!(feed = %source.name, items = items.len(), "fetched feed");
        Ok(items)
    }
}

fn classify(url: &str, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(format!("feed fetch timed out: {url}"))
    } else {
        Error::Http(e)
    }
}
