use crate::application::articles::ResolvedArticle;
use crate::application::error::{ErrorReport, HttpError};
use crate::domain::article::{Section, Source};
use crate::domain::style::ArticleStyle;
use crate::domain::topics::{Category, TopicCatalog, TopicDescriptor};
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use url::{Url, form_urlencoded};

const SITE_TITLE: &str = "Unsolved";
const SITE_DESCRIPTION: &str = "Questions science still can't answer, explained.";
const SEARCH_SUGGESTIONS: &[&str] = &["dark", "matter", "life", "consciousness", "magnetic"];

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Render the error page and attach `report` for the response logger.
pub fn render_error_response(content: ErrorPageView, report: ErrorReport) -> Response {
    let status = report.status;
    let meta = PageMetaView::new(&content.title, &content.message);
    let view = LayoutContext::new(meta, content);
    let mut response = render_template_response(ErrorTemplate { view }, status);
    report.attach(&mut response);
    response
}

pub fn render_not_found_response() -> Response {
    render_error_response(
        ErrorPageView::not_found(),
        ErrorReport::from_message(
            "presentation::views::render_not_found_response",
            StatusCode::NOT_FOUND,
            "Resource not found",
        ),
    )
}

#[derive(Clone)]
pub struct PageMetaView {
    pub title: String,
    pub description: String,
}

impl PageMetaView {
    pub fn new(title: &str, description: &str) -> Self {
        Self {
            title: format!("{title} · {SITE_TITLE}"),
            description: description.to_string(),
        }
    }

    pub fn site() -> Self {
        Self {
            title: SITE_TITLE.to_string(),
            description: SITE_DESCRIPTION.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub site_title: &'static str,
    pub meta: PageMetaView,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(meta: PageMetaView, content: T) -> Self {
        Self {
            site_title: SITE_TITLE,
            meta,
            content,
        }
    }
}

#[derive(Clone)]
pub struct TopicCard {
    pub href: String,
    pub title: String,
    pub hook: String,
    pub category_key: &'static str,
    pub category_label: &'static str,
    pub difficulty: u8,
}

impl From<&TopicDescriptor> for TopicCard {
    fn from(topic: &TopicDescriptor) -> Self {
        Self {
            href: article_href(&topic.id, ArticleStyle::Default),
            title: topic.title.clone(),
            hook: topic.hook.clone(),
            category_key: topic.category.as_str(),
            category_label: topic.category.label(),
            difficulty: topic.difficulty,
        }
    }
}

#[derive(Clone)]
pub struct FilterLinkView {
    pub label: &'static str,
    pub href: String,
    pub is_active: bool,
}

pub struct IndexView {
    pub query: String,
    pub filters: Vec<FilterLinkView>,
    pub result_label: String,
    pub featured: Option<TopicCard>,
    pub rest: Vec<TopicCard>,
    pub has_results: bool,
    pub suggestions: Vec<FilterLinkView>,
}

impl IndexView {
    /// `category` of `None` means all categories.
    pub fn build(catalog: &TopicCatalog, query: &str, category: Option<Category>) -> Self {
        let query = query.trim().to_string();
        let matches = catalog.search(&query, category);
        let count = matches.len();

        let mut cards = matches.into_iter().map(TopicCard::from);
        let featured = cards.next();
        let rest = cards.collect();

        let mut filters = vec![FilterLinkView {
            label: "All",
            href: index_href(&query, None),
            is_active: category.is_none(),
        }];
        filters.extend(Category::ALL.iter().map(|candidate| FilterLinkView {
            label: candidate.label(),
            href: index_href(&query, Some(*candidate)),
            is_active: category == Some(*candidate),
        }));

        let suggestions = SEARCH_SUGGESTIONS
            .iter()
            .copied()
            .map(|term| FilterLinkView {
                label: term,
                href: index_href(term, category),
                is_active: false,
            })
            .collect();

        Self {
            query,
            filters,
            result_label: format!("{count} result{}", if count == 1 { "" } else { "s" }),
            featured,
            rest,
            has_results: count > 0,
            suggestions,
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<IndexView>,
}

#[derive(Clone)]
pub struct StyleLinkView {
    pub label: &'static str,
    pub href: String,
    pub is_active: bool,
}

pub struct ArticlePageView {
    pub title: String,
    pub subtitle: String,
    pub reading_minutes: u32,
    pub provenance: &'static str,
    pub generated_at: Option<String>,
    pub style_label: &'static str,
    pub model: String,
    pub hero_query: String,
    pub hero_alt: String,
    pub styles: Vec<StyleLinkView>,
    pub sections: Vec<Section>,
    pub key_takeaways: Vec<String>,
    pub sources: Vec<SourceView>,
}

/// A cited source; only `http`/`https` urls become links.
#[derive(Clone)]
pub struct SourceView {
    pub label: String,
    pub url: String,
    pub href: Option<String>,
}

impl From<Source> for SourceView {
    fn from(source: Source) -> Self {
        let href = Url::parse(&source.url)
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .map(String::from);
        Self {
            label: source.label,
            url: source.url,
            href,
        }
    }
}

impl ArticlePageView {
    pub fn build(topic_id: &str, style: ArticleStyle, resolved: ResolvedArticle) -> Self {
        let ResolvedArticle {
            article,
            from_cache,
        } = resolved;
        let meta = article.meta;

        let styles = ArticleStyle::ALL
            .iter()
            .map(|candidate| StyleLinkView {
                label: candidate.label(),
                href: article_href(topic_id, *candidate),
                is_active: *candidate == style,
            })
            .collect();

        Self {
            title: article.title,
            subtitle: article.subtitle,
            reading_minutes: article.reading_minutes,
            provenance: if from_cache {
                "Cached"
            } else {
                "Freshly generated"
            },
            generated_at: meta.as_ref().map(|meta| meta.generated_at.clone()),
            style_label: meta.as_ref().map_or(style, |meta| meta.style).label(),
            model: meta
                .map(|meta| meta.model)
                .unwrap_or_else(|| "unknown".to_string()),
            hero_query: article.hero.unsplash_query,
            hero_alt: article.hero.alt,
            styles,
            sections: article.sections,
            key_takeaways: article.key_takeaways,
            sources: article.sources.into_iter().map(SourceView::from).collect(),
        }
    }
}

#[derive(Template)]
#[template(path = "article.html")]
pub struct ArticleTemplate {
    pub view: LayoutContext<ArticlePageView>,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
    pub primary_action: Option<ErrorAction>,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Mystery Not Found".to_string(),
            message: "We have no topic by that name. \
                      Browse the catalog to pick another open question."
                .to_string(),
            primary_action: Some(ErrorAction::home()),
        }
    }

    pub fn generation_failed(retry_href: String) -> Self {
        Self {
            title: "Article Not Ready".to_string(),
            message: "The article could not be generated right now. Please try again in a moment."
                .to_string(),
            primary_action: Some(ErrorAction {
                href: retry_href,
                label: "Try again".to_string(),
            }),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            title: "Service Temporarily Unavailable".to_string(),
            message: "Our article cache is unreachable at the moment. Please try again shortly."
                .to_string(),
            primary_action: Some(ErrorAction::home()),
        }
    }
}

pub struct ErrorAction {
    pub href: String,
    pub label: String,
}

impl ErrorAction {
    pub fn home() -> Self {
        Self {
            href: "/".to_string(),
            label: "Back to all mysteries".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

pub fn article_href(topic_id: &str, style: ArticleStyle) -> String {
    match style {
        ArticleStyle::Default => format!("/mysteries/{topic_id}"),
        other => format!("/mysteries/{topic_id}?style={}", other.as_str()),
    }
}

fn index_href(query: &str, category: Option<Category>) -> String {
    let mut params = form_urlencoded::Serializer::new(String::new());
    if !query.is_empty() {
        params.append_pair("q", query);
    }
    if let Some(category) = category {
        params.append_pair("category", category.as_str());
    }
    let params = params.finish();
    if params.is_empty() {
        "/".to_string()
    } else {
        format!("/?{params}")
    }
}
