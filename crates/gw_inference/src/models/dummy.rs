use async_trait::async_trait;

use gw_core::{source_domain, CommentaryModel, Result};

/// Deterministic stand-in for the real text-generation service. Used by
/// tests and `--model dummy` dry runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct DummyModel;

#[async_trait]
impl CommentaryModel for DummyModel {
    fn name(&self) -> &str {
        "dummy"
    }

    async fn commentary(&self, title: &str, url: &str) -> Result<String> {
        let host = source_domain(url).unwrap_or_else(|| "unknown".to_string());
        Ok(format!(
            "{title}.\n\nThat is the whole headline, and somehow it is still too much.\n\nSource: {host}"
        ))
    }
}
