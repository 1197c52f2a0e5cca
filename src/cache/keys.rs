//! Cache key definitions.
//!
//! Article entries and their generation locks share one identity,
//! `(cache version, topic id, style)`, but live under independent keys.

use std::fmt;

use crate::domain::style::ArticleStyle;

const ARTICLE_NAMESPACE: &str = "mystery";
const LOCK_SUFFIX: &str = "lock";

/// Identifies one cached article.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArticleKey {
    pub version: String,
    /// Normalized topic id.
    pub topic_id: String,
    pub style: ArticleStyle,
}

impl ArticleKey {
    pub fn new(
        version: impl Into<String>,
        topic_id: impl Into<String>,
        style: ArticleStyle,
    ) -> Self {
        Self {
            version: version.into(),
            topic_id: topic_id.into(),
            style,
        }
    }

    /// Key of the permanent article entry.
    pub fn cache_key(&self) -> String {
        format!(
            "{ARTICLE_NAMESPACE}:{}:{}:style:{}",
            self.version,
            self.topic_id,
            self.style.as_str()
        )
    }

    /// Key of the short-lived generation lock for the same entry.
    pub fn lock_key(&self) -> String {
        format!("{}:{LOCK_SUFFIX}", self.cache_key())
    }
}

impl fmt::Display for ArticleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cache_key())
    }
}
