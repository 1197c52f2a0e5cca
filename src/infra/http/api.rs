use axum::{
    Json,
    extract::{Path, Query, State},
};

use crate::application::{articles::ResolvedArticle, error::HttpError, news::NewsResponse};
use crate::domain::style::ArticleStyle;

use super::HttpState;
use super::public::StyleQuery;

pub(super) async fn article(
    State(state): State<HttpState>,
    Path(id): Path<String>,
    Query(query): Query<StyleQuery>,
) -> Result<Json<ResolvedArticle>, HttpError> {
    let style = ArticleStyle::from_query(query.style.as_deref());
    let resolved = state.articles.resolve(&id, style).await?;
    Ok(Json(resolved))
}

pub(super) async fn news(State(state): State<HttpState>) -> Result<Json<NewsResponse>, HttpError> {
    let response = state.news.latest().await?;
    Ok(Json(response))
}
