use async_trait::async_trait;

use crate::Result;

/// One bounded unit of pipeline work. Returns the number of items it
/// processed.
#[async_trait]
pub trait PipelineStage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self) -> Result<u64>;
}
