//! Tolerant normalization of raw model output into an [`ArticleDraft`].
//!
//! This stage never fails. Missing strings become empty (or fall back to the
//! topic), missing arrays become empty, blank paragraphs are dropped, sections
//! left without paragraphs are dropped, and sources missing a label or url are
//! dropped. Whether the result is acceptable is decided by
//! [`ArticleDraft::validate`](super::article::ArticleDraft::validate).

use serde_json::Value;

use super::article::{ArticleDraft, Hero, Section, Source};
use super::topics::TopicDescriptor;

const DEFAULT_READING_MINUTES: f64 = 8.0;
const UNTITLED_SECTION: &str = "Untitled section";

/// Normalize an untyped payload, using the topic for fallback identity fields.
pub fn sanitize_payload(payload: &Value, topic: &TopicDescriptor) -> ArticleDraft {
    let hero = payload.get("hero");

    ArticleDraft {
        id: coerce_string(payload.get("id")).unwrap_or_else(|| topic.id.clone()),
        title: coerce_string(payload.get("title")).unwrap_or_else(|| topic.title.clone()),
        subtitle: coerce_string(payload.get("subtitle")).unwrap_or_default(),
        reading_minutes: coerce_number(payload.get("readingMinutes"), DEFAULT_READING_MINUTES),
        hero: Hero {
            unsplash_query: coerce_string(hero.and_then(|h| h.get("unsplashQuery")))
                .unwrap_or_else(|| topic.title.clone()),
            alt: coerce_string(hero.and_then(|h| h.get("alt")))
                .unwrap_or_else(|| topic.title.clone()),
        },
        sections: sanitize_sections(payload.get("sections")),
        key_takeaways: trimmed_strings(payload.get("keyTakeaways")),
        sources: sanitize_sources(payload.get("sources")),
        meta: None,
    }
}

fn sanitize_sections(value: Option<&Value>) -> Vec<Section> {
    let Some(Value::Array(sections)) = value else {
        return Vec::new();
    };

    sections
        .iter()
        .map(|section| {
            let heading = coerce_string(section.get("heading"))
                .map(|heading| heading.trim().to_string())
                .filter(|heading| !heading.is_empty())
                .unwrap_or_else(|| UNTITLED_SECTION.to_string());
            Section {
                heading,
                paragraphs: trimmed_strings(section.get("paragraphs")),
            }
        })
        .filter(|section| !section.paragraphs.is_empty())
        .collect()
}

fn sanitize_sources(value: Option<&Value>) -> Vec<Source> {
    let Some(Value::Array(sources)) = value else {
        return Vec::new();
    };

    sources
        .iter()
        .map(|source| Source {
            label: coerce_string(source.get("label"))
                .unwrap_or_default()
                .trim()
                .to_string(),
            url: coerce_string(source.get("url"))
                .unwrap_or_default()
                .trim()
                .to_string(),
        })
        .filter(|source| !source.label.is_empty() && !source.url.is_empty())
        .collect()
}

/// Stringify each element of an array, trim it, and drop the blanks.
fn trimmed_strings(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| coerce_string(Some(item)))
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Scalars are stringified; null, missing and structured values yield `None`.
fn coerce_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Numeric coercion; unparseable input becomes NaN so that validation rejects it.
fn coerce_number(value: Option<&Value>, default: f64) -> f64 {
    match value {
        None | Some(Value::Null) => default,
        Some(Value::Number(number)) => number.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse().unwrap_or(f64::NAN)
            }
        }
        Some(Value::Bool(flag)) => f64::from(u8::from(*flag)),
        Some(Value::Array(_) | Value::Object(_)) => f64::NAN,
    }
}
