use std::sync::Arc;

use gw_core::{CommentaryModel, Error, Result};

pub mod dummy;
pub mod openai;

pub use dummy::DummyModel;
pub use openai::{OpenAiConfig, OpenAiModel};

/// Build a commentary model by name. `dummy` needs no credentials and is
/// meant for tests and dry runs.
pub fn create_model(kind: &str, config: OpenAiConfig) -> Result<Arc<dyn CommentaryModel>> {
    match kind {
        "openai" => Ok(Arc::new(OpenAiModel::new(config)?)),
        "dummy" => Ok(Arc::new(DummyModel)),
        other => Err(Error::Inference(format!("unknown model kind: {other}"))),
    }
}
