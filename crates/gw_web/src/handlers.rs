use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use gw_core::Error;

use crate::shaper;
use crate::AppState;

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 50;

pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self.0, "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "internal error" })),
        )
            .into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

pub async fn list_articles(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Response, ApiError> {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = (page - 1).saturating_mul(limit);

    let total = state.store.summarized_count().await?;
    let total_pages = (total.div_ceil(limit as u64)).max(1);

    // shape a window covering the page plus the scan horizon so the
    // reorder stays stable across page boundaries
    let fetch = offset
        .saturating_add(limit)
        .saturating_add(state.shaper.scan_horizon as u32);
    let candidates = state.store.summarized_page(fetch, 0).await?;
    let shaped = shaper::shape(candidates, &state.shaper);

    let articles: Vec<_> = shaped
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect();

    Ok(Json(json!({
        "page": page,
        "limit": limit,
        "total": total,
        "total_pages": total_pages,
        "articles": articles,
    }))
    .into_response())
}

pub async fn get_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    match state.store.get(id).await? {
        Some(article) if article.has_summary() => Ok(Json(article).into_response()),
        _ => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "not found" })),
        )
            .into_response()),
    }
}

fn authorized(state: &AppState, headers: &HeaderMap) -> bool {
    headers
        .get("x-admin-token")
        .and_then(|v| v.to_str().ok())
        .map_or(false, |token| token == state.admin_token)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "unauthorized" })),
    )
        .into_response()
}

pub async fn trigger_pipeline(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }

    match state.runner.trigger("admin") {
        Ok(()) => (StatusCode::ACCEPTED, Json(json!({ "status": "started" }))).into_response(),
        Err(_) => (
            StatusCode::CONFLICT,
            Json(json!({ "error": "already running" })),
        )
            .into_response(),
    }
}

pub async fn pipeline_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    Json(state.runner.status()).into_response()
}

pub async fn reset_pipeline(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    Json(json!({ "was_running": state.runner.reset() })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shaper::ShaperConfig;
    use crate::{create_app, AppState};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::Utc;
    use gw_core::{ArticleStore, NewArticle, PipelineStage, Result};
    use gw_pipeline::PipelineRunner;
    use gw_storage::MemoryStore;
    use std::time::Duration;
    use tower::ServiceExt;

    struct SleepStage(Duration);

    #[async_trait]
    impl PipelineStage for SleepStage {
        fn name(&self) -> &'static str {
            "stage"
        }

        async fn run(&self) -> Result<u64> {
            tokio::time::sleep(self.0).await;
            Ok(0)
        }
    }

    fn new_article(n: u32, domain: &str) -> NewArticle {
        NewArticle {
            title: format!("Distinct headline number {n} about subject {n}"),
            url: format!("https://{domain}/{n}"),
            category: "world".to_string(),
            source_name: domain.to_string(),
            source_url: format!("https://{domain}/feed"),
            source_domain: domain.to_string(),
            published_at: None,
        }
    }

    async fn test_state(stage_delay: Duration) -> (Arc<MemoryStore>, AppState) {
        let store = Arc::new(MemoryStore::new());
        let runner = PipelineRunner::new(
            Arc::new(SleepStage(stage_delay)),
            Arc::new(SleepStage(Duration::ZERO)),
            Duration::from_secs(5),
        );
        let state = AppState {
            store: store.clone(),
            runner,
            admin_token: "sesame".to_string(),
            shaper: ShaperConfig::default(),
        };
        (store, state)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn list_serves_only_summarized_articles() {
        let (store, state) = test_state(Duration::ZERO).await;

        store.insert_article(&new_article(1, "a.com")).await.unwrap();
        store.insert_article(&new_article(2, "b.com")).await.unwrap();
        store.insert_article(&new_article(3, "c.com")).await.unwrap();
        store.set_summary(1, "one", Utc::now()).await.unwrap();
        store.set_summary(2, "two", Utc::now()).await.unwrap();

        let app = create_app(state);
        let response = app
            .oneshot(Request::builder().uri("/api/articles").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["total"], 2);
        assert_eq!(body["articles"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn list_clamps_the_limit() {
        let (_store, state) = test_state(Duration::ZERO).await;

        let app = create_app(state);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/articles?limit=500")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["limit"], 50);
    }

    #[tokio::test]
    async fn single_article_hides_unsummarized_records() {
        let (store, state) = test_state(Duration::ZERO).await;

        store.insert_article(&new_article(1, "a.com")).await.unwrap();
        store.insert_article(&new_article(2, "b.com")).await.unwrap();
        store.set_summary(1, "one", Utc::now()).await.unwrap();

        let app = create_app(state);

        let ok = app
            .clone()
            .oneshot(Request::builder().uri("/api/articles/1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);

        let hidden = app
            .clone()
            .oneshot(Request::builder().uri("/api/articles/2").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(hidden.status(), StatusCode::NOT_FOUND);

        let missing = app
            .oneshot(Request::builder().uri("/api/articles/99").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    fn admin_request(path: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("POST").uri(path);
        if let Some(token) = token {
            builder = builder.header("x-admin-token", token);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn admin_endpoints_require_the_exact_token() {
        let (_store, state) = test_state(Duration::ZERO).await;
        let app = create_app(state);

        let no_token = app
            .clone()
            .oneshot(admin_request("/api/admin/pipeline/trigger", None))
            .await
            .unwrap();
        assert_eq!(no_token.status(), StatusCode::UNAUTHORIZED);

        let wrong = app
            .clone()
            .oneshot(admin_request("/api/admin/pipeline/trigger", Some("sesame ")))
            .await
            .unwrap();
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

        let right = app
            .oneshot(admin_request("/api/admin/pipeline/trigger", Some("sesame")))
            .await
            .unwrap();
        assert_eq!(right.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn concurrent_trigger_conflicts() {
        let (_store, state) = test_state(Duration::from_millis(300)).await;
        let app = create_app(state);

        let first = app
            .clone()
            .oneshot(admin_request("/api/admin/pipeline/trigger", Some("sesame")))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::ACCEPTED);

        let second = app
            .clone()
            .oneshot(admin_request("/api/admin/pipeline/trigger", Some("sesame")))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);

        // reset frees the lock without waiting for the run
        let reset = app
            .clone()
            .oneshot(admin_request("/api/admin/pipeline/reset", Some("sesame")))
            .await
            .unwrap();
        assert_eq!(reset.status(), StatusCode::OK);
        let body = body_json(reset).await;
        assert_eq!(body["was_running"], true);
    }

    #[tokio::test]
    async fn status_reports_the_running_flag() {
        let (_store, state) = test_state(Duration::from_millis(200)).await;
        let app = create_app(state);

        let trigger = app
            .clone()
            .oneshot(admin_request("/api/admin/pipeline/trigger", Some("sesame")))
            .await
            .unwrap();
        assert_eq!(trigger.status(), StatusCode::ACCEPTED);

        let status = app
            .oneshot(
                Request::builder()
                    .uri("/api/admin/pipeline/status")
                    .header("x-admin-token", "sesame")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(status.status(), StatusCode::OK);
        let body = body_json(status).await;
        assert_eq!(body["running"], true);
        assert!(body["started_at"].is_string());
    }
}
