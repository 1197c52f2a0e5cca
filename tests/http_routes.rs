mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use unsolved::application::generator::TextGenerator;
use unsolved::application::news::{
    FeedConfig, FeedEntry, FeedFetchError, FeedSource, NewsPolicy, NewsService,
};
use unsolved::application::store::KeyValueStore;
use unsolved::infra::http::{HttpState, build_router};
use unsolved::infra::store::MemoryStore;

use common::*;

struct OneEntryFeed;

#[async_trait]
impl FeedSource for OneEntryFeed {
    async fn fetch(
        &self,
        _feed: &FeedConfig,
        _limit: usize,
    ) -> Result<Vec<FeedEntry>, FeedFetchError> {
        Ok(vec![FeedEntry {
            title: "Attention is still all you need".to_string(),
            link: "https://arxiv.org/abs/0001".to_string(),
            date: Some("2025-06-02T04:00:00+00:00".to_string()),
        }])
    }
}

fn router(store: Arc<dyn KeyValueStore>, generator: Arc<dyn TextGenerator>) -> Router {
    let news = NewsService::new(
        store.clone(),
        Arc::new(OneEntryFeed),
        NewsPolicy {
            cache_key: "news:v1".to_string(),
            ttl: Duration::from_secs(900),
            items_per_feed: 8,
            feeds: vec![FeedConfig {
                key: "arxiv-ai".to_string(),
                name: "arXiv cs.AI".to_string(),
                url: "https://rss.arxiv.org/rss/cs.AI".to_string(),
            }],
        },
    );
    build_router(HttpState {
        articles: Arc::new(article_service(store.clone(), generator)),
        news: Arc::new(news),
        store,
    })
}

fn default_router() -> Router {
    router(
        Arc::new(MemoryStore::new()),
        Arc::new(ScriptedGenerator::replying(valid_payload())),
    )
}

async fn get(app: &Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");
    app.clone()
        .oneshot(request)
        .await
        .expect("router should respond")
}

async fn body_text(response: Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).expect("json body")
}

fn content_type(response: &Response) -> &str {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn index_lists_topics() {
    let app = default_router();

    let response = get(&app, "/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(content_type(&response).starts_with("text/html"));
    let html = body_text(response).await;
    assert!(html.contains("dark-matter"));
}

#[tokio::test]
async fn index_accepts_search_and_unknown_category() {
    let app = default_router();

    let response = get(&app, "/?q=zzzz&category=not-a-category").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("0 results"));
}

#[tokio::test]
async fn article_api_generates_then_serves_from_cache() {
    let generator = Arc::new(ScriptedGenerator::replying(valid_payload()));
    let app = router(Arc::new(MemoryStore::new()), generator.clone());

    let first = get(&app, "/api/mysteries/dark-matter").await;
    assert_eq!(first.status(), StatusCode::OK);
    let first = body_json(first).await;
    assert_eq!(first["fromCache"], Value::Bool(false));
    assert_eq!(first["article"]["meta"]["style"], "default");
    assert_eq!(first["article"]["meta"]["cacheVersion"], "v1");
    assert_eq!(first["article"]["sections"].as_array().map(Vec::len), Some(3));

    let second = body_json(get(&app, "/api/mysteries/dark-matter").await).await;
    assert_eq!(second["fromCache"], Value::Bool(true));
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn article_api_honours_style_and_falls_back_for_unknown_ones() {
    let app = default_router();

    let short = body_json(get(&app, "/api/mysteries/dark-matter?style=short").await).await;
    assert_eq!(short["article"]["meta"]["style"], "short");

    let fallback = body_json(get(&app, "/api/mysteries/dark-matter?style=haiku").await).await;
    assert_eq!(fallback["article"]["meta"]["style"], "default");
}

#[tokio::test]
async fn article_api_maps_errors_to_statuses() {
    let app = router(
        Arc::new(MemoryStore::new()),
        Arc::new(ScriptedGenerator::failing()),
    );
    assert_eq!(
        get(&app, "/api/mysteries/no-such-topic").await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        get(&app, "/api/mysteries/dark-matter").await.status(),
        StatusCode::SERVICE_UNAVAILABLE
    );

    let down = router(
        Arc::new(UnreachableStore),
        Arc::new(ScriptedGenerator::replying(valid_payload())),
    );
    assert_eq!(
        get(&down, "/api/mysteries/dark-matter").await.status(),
        StatusCode::SERVICE_UNAVAILABLE
    );
}

#[tokio::test]
async fn article_page_renders_html() {
    let app = default_router();

    let response = get(&app, "/mysteries/dark-matter?style=eli12").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(content_type(&response).starts_with("text/html"));
    let html = body_text(response).await;
    assert!(html.contains("The invisible scaffolding"));
    assert!(html.contains("Freshly generated"));
}

#[tokio::test]
async fn article_page_errors_render_error_pages() {
    let app = router(
        Arc::new(MemoryStore::new()),
        Arc::new(ScriptedGenerator::failing()),
    );

    let missing = get(&app, "/mysteries/no-such-topic").await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert!(body_text(missing).await.contains("Mystery Not Found"));

    let failed = get(&app, "/mysteries/dark-matter").await;
    assert_eq!(failed.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(body_text(failed).await.contains("Try again"));
}

#[tokio::test]
async fn news_api_returns_items() {
    let app = default_router();

    let first = get(&app, "/api/news").await;
    assert_eq!(first.status(), StatusCode::OK);
    let first = body_json(first).await;
    assert_eq!(first["fromCache"], Value::Bool(false));
    assert_eq!(first["items"][0]["source"], "arXiv cs.AI");
    assert!(first["items"][0].get("error").is_none());

    let second = body_json(get(&app, "/api/news").await).await;
    assert_eq!(second["fromCache"], Value::Bool(true));
}

#[tokio::test]
async fn health_reflects_store_reachability() {
    assert_eq!(
        get(&default_router(), "/_health").await.status(),
        StatusCode::NO_CONTENT
    );

    let down = router(
        Arc::new(UnreachableStore),
        Arc::new(ScriptedGenerator::replying(valid_payload())),
    );
    assert_eq!(
        get(&down, "/_health").await.status(),
        StatusCode::SERVICE_UNAVAILABLE
    );
}

#[tokio::test]
async fn unknown_paths_render_not_found_page() {
    let response = get(&default_router(), "/no/such/page").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("Mystery Not Found"));
}

#[tokio::test]
async fn article_page_never_links_script_sources() {
    let mut payload: Value = serde_json::from_str(&valid_payload()).expect("json");
    payload["sources"] = serde_json::json!([
        { "label": "NASA", "url": "javascript:alert(document.cookie)" },
        { "label": "CERN", "url": "https://home.cern/science/physics/dark-matter" }
    ]);
    let app = router(
        Arc::new(MemoryStore::new()),
        Arc::new(ScriptedGenerator::replying(payload.to_string())),
    );

    let response = get(&app, "/mysteries/dark-matter").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await.to_lowercase();

    assert!(!html.contains("href=\"javascript:"));
    assert!(html.contains("javascript:alert"), "url still shown as text");
    assert!(html.contains("home.cern"));
}

#[tokio::test]
async fn page_and_api_resolve_encoded_ids_alike() {
    let app = default_router();

    for path in ["dark-matter", "Dark-Matter", "%2564ark-matter", "%252564ark-matter"] {
        let page = get(&app, &format!("/mysteries/{path}")).await.status();
        let api = get(&app, &format!("/api/mysteries/{path}")).await.status();
        assert_eq!(page, api, "page and api disagree on `{path}`");
    }
}
