pub mod models;

pub use models::{create_model, DummyModel, OpenAiConfig, OpenAiModel};

pub mod prelude {
    pub use super::models::{create_model, OpenAiConfig};
    pub use gw_core::{CommentaryModel, Result};
}
