use std::sync::Arc;

use gw_core::ArticleStore;
use gw_pipeline::PipelineRunner;

use crate::shaper::ShaperConfig;

pub struct AppState {
    pub store: Arc<dyn ArticleStore>,
    pub runner: Arc<PipelineRunner>,
    pub admin_token: String,
    pub shaper: ShaperConfig,
}
