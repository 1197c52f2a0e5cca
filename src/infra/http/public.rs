use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
};
use serde::Deserialize;

use crate::{
    application::{articles::ArticleError, error::ErrorReport},
    domain::{
        style::ArticleStyle,
        topics::{Category, normalize_topic_id},
    },
    presentation::views::{
        ArticlePageView, ArticleTemplate, ErrorPageView, IndexTemplate, IndexView,
        LayoutContext, PageMetaView, article_href, render_error_response,
        render_not_found_response, render_template_response,
    },
};

use super::HttpState;

const ERROR_SOURCE: &str = "infra::http::public::article_page";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct IndexQuery {
    q: Option<String>,
    category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct StyleQuery {
    pub(super) style: Option<String>,
}

pub(super) async fn index(
    State(state): State<HttpState>,
    Query(query): Query<IndexQuery>,
) -> Response {
    // "all" and unknown keys both mean no category filter.
    let category = query.category.as_deref().and_then(Category::parse);
    let content = IndexView::build(
        state.articles.catalog(),
        query.q.as_deref().unwrap_or_default(),
        category,
    );
    let view = LayoutContext::new(PageMetaView::site(), content);
    render_template_response(IndexTemplate { view }, StatusCode::OK)
}

pub(super) async fn article_page(
    State(state): State<HttpState>,
    Path(id): Path<String>,
    Query(query): Query<StyleQuery>,
) -> Response {
    let style = ArticleStyle::from_query(query.style.as_deref());
    // Links only; `resolve` normalizes the raw id itself.
    let topic_id = normalize_topic_id(&id);

    match state.articles.resolve(&id, style).await {
        Ok(resolved) => {
            let content = ArticlePageView::build(&topic_id, style, resolved);
            let meta = PageMetaView::new(&content.title, &content.subtitle);
            let view = LayoutContext::new(meta, content);
            render_template_response(ArticleTemplate { view }, StatusCode::OK)
        }
        Err(err) => article_error_response(&topic_id, style, err),
    }
}

fn article_error_response(topic_id: &str, style: ArticleStyle, err: ArticleError) -> Response {
    let (status, page) = match &err {
        ArticleError::UnknownTopic(_) => (StatusCode::NOT_FOUND, ErrorPageView::not_found()),
        ArticleError::GenerationFailed(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            ErrorPageView::generation_failed(article_href(topic_id, style)),
        ),
        ArticleError::Store(_) => (StatusCode::SERVICE_UNAVAILABLE, ErrorPageView::unavailable()),
    };
    render_error_response(page, ErrorReport::from_error(ERROR_SOURCE, status, &err))
}

pub(super) async fn fallback() -> Response {
    render_not_found_response()
}
