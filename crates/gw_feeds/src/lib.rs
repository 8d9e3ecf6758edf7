pub mod client;
pub mod ingest;
pub mod sources;

pub use client::{FeedClient, HttpFeedClient};
pub use ingest::IngestStage;
pub use sources::default_sources;

pub mod prelude {
    pub use super::client::{FeedClient, HttpFeedClient};
    pub use super::ingest::IngestStage;
    pub use gw_core::{FeedItem, FeedSource, Result};
}
