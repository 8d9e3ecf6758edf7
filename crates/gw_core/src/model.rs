use async_trait::async_trait;

use crate::Result;

/// External text-generation collaborator. Implementations see only the
/// headline and link of an article; the commentary they return names the
/// source by domain and never contains the raw link.
#[async_trait]
pub trait CommentaryModel: Send + Sync {
    fn name(&self) -> &str;

    async fn commentary(&self, title: &str, url: &str) -> Result<String>;
}
