//! HTTP surface: HTML pages, the JSON API and health checks.

mod api;
mod middleware;
mod public;

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::application::{
    articles::ArticleService, error::ErrorReport, news::NewsService, store::KeyValueStore,
    store::StoreError,
};

pub use middleware::RequestContext;

#[derive(Clone)]
pub struct HttpState {
    pub articles: Arc<ArticleService>,
    pub news: Arc<NewsService>,
    pub store: Arc<dyn KeyValueStore>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(public::index))
        .route("/mysteries/{id}", get(public::article_page))
        .route("/api/mysteries/{id}", get(api::article))
        .route("/api/news", get(api::news))
        .route("/_health", get(health))
        .fallback(public::fallback)
        .with_state(state)
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}

async fn health(State(state): State<HttpState>) -> Response {
    store_health_response(state.store.ping().await)
}

fn store_health_response(result: Result<(), StoreError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::store_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}
