//! The generated article model and its strict validation stage.
//!
//! [`ArticleDraft`] is what the sanitizer produces from untrusted model output.
//! [`ArticleDraft::validate`] is the only way to obtain an [`Article`], so every
//! article held by the application satisfies the bounds below.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use super::style::ArticleStyle;

pub const READING_MINUTES_MIN: u32 = 1;
pub const READING_MINUTES_MAX: u32 = 30;
pub const SECTIONS_MIN: usize = 3;
pub const TAKEAWAYS_MIN: usize = 3;
pub const TAKEAWAYS_MAX: usize = 8;
pub const SOURCES_MIN: usize = 2;
pub const SOURCES_MAX: usize = 8;
pub const HERO_TEXT_MIN_CHARS: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    pub reading_minutes: u32,
    pub hero: Hero,
    pub sections: Vec<Section>,
    pub key_takeaways: Vec<String>,
    pub sources: Vec<Source>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ArticleMeta>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hero {
    /// Image search query describing a suitable header picture.
    pub unsplash_query: String,
    pub alt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub heading: String,
    pub paragraphs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleMeta {
    /// RFC 3339 timestamp of the generation.
    pub generated_at: String,
    pub model: String,
    pub style: ArticleStyle,
    pub cache_version: String,
}

/// Best-effort article assembled from model output; not yet checked against bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleDraft {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    /// Kept as a float so that fractional or non-numeric input can be rejected.
    pub reading_minutes: f64,
    pub hero: Hero,
    pub sections: Vec<Section>,
    pub key_takeaways: Vec<String>,
    pub sources: Vec<Source>,
    pub meta: Option<ArticleMeta>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("readingMinutes must be an integer between 1 and 30, got {0}")]
    ReadingMinutes(f64),
    #[error("hero.{field} must have at least 2 characters")]
    HeroText { field: &'static str },
    #[error("expected at least 3 sections, found {found}")]
    TooFewSections { found: usize },
    #[error("section {index} has no paragraphs")]
    EmptySection { index: usize },
    #[error("expected 3 to 8 key takeaways, found {found}")]
    TakeawayCount { found: usize },
    #[error("expected 2 to 8 sources, found {found}")]
    SourceCount { found: usize },
    #[error("source {index} has an invalid url `{url}`")]
    SourceUrl { index: usize, url: String },
}

impl ArticleDraft {
    pub fn with_meta(mut self, meta: ArticleMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Check every bound and produce an [`Article`]. No repair happens here.
    pub fn validate(self) -> Result<Article, ValidationError> {
        let reading_minutes = reading_minutes(self.reading_minutes)?;

        if self.hero.unsplash_query.chars().count() < HERO_TEXT_MIN_CHARS {
            return Err(ValidationError::HeroText {
                field: "unsplashQuery",
            });
        }
        if self.hero.alt.chars().count() < HERO_TEXT_MIN_CHARS {
            return Err(ValidationError::HeroText { field: "alt" });
        }

        if self.sections.len() < SECTIONS_MIN {
            return Err(ValidationError::TooFewSections {
                found: self.sections.len(),
            });
        }
        if let Some(index) = self
            .sections
            .iter()
            .position(|section| section.paragraphs.is_empty())
        {
            return Err(ValidationError::EmptySection { index });
        }

        let takeaways = self.key_takeaways.len();
        if !(TAKEAWAYS_MIN..=TAKEAWAYS_MAX).contains(&takeaways) {
            return Err(ValidationError::TakeawayCount { found: takeaways });
        }

        let sources = self.sources.len();
        if !(SOURCES_MIN..=SOURCES_MAX).contains(&sources) {
            return Err(ValidationError::SourceCount { found: sources });
        }
        for (index, source) in self.sources.iter().enumerate() {
            if Url::parse(&source.url).is_err() {
                return Err(ValidationError::SourceUrl {
                    index,
                    url: source.url.clone(),
                });
            }
        }

        Ok(Article {
            id: self.id,
            title: self.title,
            subtitle: self.subtitle,
            reading_minutes,
            hero: self.hero,
            sections: self.sections,
            key_takeaways: self.key_takeaways,
            sources: self.sources,
            meta: self.meta,
        })
    }
}

fn reading_minutes(value: f64) -> Result<u32, ValidationError> {
    let in_range =
        value >= f64::from(READING_MINUTES_MIN) && value <= f64::from(READING_MINUTES_MAX);
    if !value.is_finite() || value.fract() != 0.0 || !in_range {
        return Err(ValidationError::ReadingMinutes(value));
    }
    Ok(value as u32)
}
