use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

pub mod handlers;
pub mod shaper;
pub mod state;

pub use state::AppState;

use gw_core::{Error, Result};

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/api/articles", get(handlers::list_articles))
        .route("/api/articles/:id", get(handlers::get_article))
        .route("/api/admin/pipeline/trigger", post(handlers::trigger_pipeline))
        .route("/api/admin/pipeline/status", get(handlers::pipeline_status))
        .route("/api/admin/pipeline/reset", post(handlers::reset_pipeline))
        .layer(cors)
        .with_state(Arc::new(state))
}

/// Bind and serve until the process is stopped.
pub async fn serve(state: AppState, addr: &str) -> Result<()> {
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(Error::Io)?;
    tracing::info!(addr, "listening");
    axum::serve(listener, app).await.map_err(Error::Io)?;
    Ok(())
}
