//! Headline aggregation over several syndicated feeds.
//!
//! The whole aggregate lives under one short-lived cache key. Feeds are fetched
//! concurrently and fail independently: a broken feed contributes a single
//! placeholder item instead of failing the response.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use metrics::counter;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::store::{KeyValueStore, SetOptions, StoreError};

const LOG_TARGET: &str = "unsolved::news";

const METRIC_NEWS_CACHE_HIT: &str = "unsolved_news_cache_hit_total";
const METRIC_NEWS_FEED_FAILED: &str = "unsolved_news_feed_failed_total";

pub const UNAVAILABLE_TITLE: &str = "(Feed temporarily unavailable)";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    pub key: String,
    /// Display name, reported as the item source.
    pub name: String,
    pub url: String,
}

/// One entry as read from a feed, before it is attributed to a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    /// RFC 3339 publication date when the feed provides one.
    pub date: Option<String>,
}

#[derive(Debug, Error)]
pub enum FeedFetchError {
    #[error("feed request failed: {0}")]
    Transport(String),
    #[error("feed server returned status {0}")]
    Status(u16),
    #[error("feed document could not be parsed: {0}")]
    Parse(String),
}

#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch at most `limit` entries from `feed`, in feed order.
    async fn fetch(&self, feed: &FeedConfig, limit: usize)
    -> Result<Vec<FeedEntry>, FeedFetchError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub source: String,
    pub title: String,
    pub link: String,
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub error: bool,
}

impl NewsItem {
    fn from_entry(source: &str, entry: FeedEntry) -> Self {
        Self {
            source: source.to_string(),
            title: entry.title,
            link: entry.link,
            date: entry.date,
            error: false,
        }
    }

    fn unavailable(source: &str) -> Self {
        Self {
            source: source.to_string(),
            title: UNAVAILABLE_TITLE.to_string(),
            link: String::new(),
            date: None,
            error: true,
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsResponse {
    pub from_cache: bool,
    pub items: Vec<NewsItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsPolicy {
    pub cache_key: String,
    pub ttl: Duration,
    pub items_per_feed: usize,
    pub feeds: Vec<FeedConfig>,
}

impl From<&crate::config::NewsSettings> for NewsPolicy {
    fn from(settings: &crate::config::NewsSettings) -> Self {
        Self {
            cache_key: settings.cache_key.clone(),
            ttl: settings.ttl,
            items_per_feed: settings.items_per_feed,
            feeds: settings.feeds.clone(),
        }
    }
}

#[derive(Clone)]
pub struct NewsService {
    store: Arc<dyn KeyValueStore>,
    source: Arc<dyn FeedSource>,
    policy: NewsPolicy,
}

impl NewsService {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        source: Arc<dyn FeedSource>,
        policy: NewsPolicy,
    ) -> Self {
        Self {
            store,
            source,
            policy,
        }
    }

    pub async fn latest(&self) -> Result<NewsResponse, StoreError> {
        if let Some(items) = self.read_cached().await? {
            counter!(METRIC_NEWS_CACHE_HIT).increment(1);
            return Ok(NewsResponse {
                from_cache: true,
                items,
            });
        }

        let items = self.aggregate().await;

        match serde_json::to_string(&items) {
            Ok(payload) => {
                if let Err(err) = self
                    .store
                    .set(
                        &self.policy.cache_key,
                        &payload,
                        SetOptions::expiring(self.policy.ttl),
                    )
                    .await
                {
                    warn!(target: LOG_TARGET, error = %err, "Failed to cache news aggregate");
                }
            }
            Err(err) => {
                warn!(target: LOG_TARGET, error = %err, "Failed to serialize news aggregate");
            }
        }

        Ok(NewsResponse {
            from_cache: false,
            items,
        })
    }

    async fn read_cached(&self) -> Result<Option<Vec<NewsItem>>, StoreError> {
        let Some(raw) = self.store.get(&self.policy.cache_key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(items) => Ok(Some(items)),
            Err(err) => {
                warn!(target: LOG_TARGET, error = %err, "Discarding unreadable news cache entry");
                Ok(None)
            }
        }
    }

    async fn aggregate(&self) -> Vec<NewsItem> {
        let limit = self.policy.items_per_feed;
        let fetches = self
            .policy
            .feeds
            .iter()
            .map(|feed| async move { (feed, self.source.fetch(feed, limit).await) });

        let mut items = Vec::new();
        for (feed, outcome) in join_all(fetches).await {
            match outcome {
                Ok(entries) => {
                    debug!(
                        target: LOG_TARGET,
                        feed = %feed.key,
                        entries = entries.len(),
                        "Feed fetched"
                    );
                    items.extend(
                        entries
                            .into_iter()
                            .take(limit)
                            .map(|entry| NewsItem::from_entry(&feed.name, entry)),
                    );
                }
                Err(err) => {
                    counter!(METRIC_NEWS_FEED_FAILED, "feed" => feed.key.clone()).increment(1);
                    warn!(target: LOG_TARGET, feed = %feed.key, error = %err, "Feed unavailable");
                    items.push(NewsItem::unavailable(&feed.name));
                }
            }
        }

        sort_newest_first(&mut items);
        info!(
            target: LOG_TARGET,
            feeds = self.policy.feeds.len(),
            items = items.len(),
            "News aggregate refreshed"
        );
        items
    }
}

/// Descending by date string; undated items sort as the empty string, i.e. last.
fn sort_newest_first(items: &mut [NewsItem]) {
    items.sort_by(|a, b| {
        let a = a.date.as_deref().unwrap_or_default();
        let b = b.date.as_deref().unwrap_or_default();
        b.cmp(a)
    });
}
