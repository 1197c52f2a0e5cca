//! RSS/Atom fetching for the news aggregate.

use std::time::Duration;

use async_trait::async_trait;
use feed_rs::parser;
use reqwest::Client;

use crate::application::news::{FeedConfig, FeedEntry, FeedFetchError, FeedSource};

const USER_AGENT: &str = concat!("unsolved/", env!("CARGO_PKG_VERSION"));

pub struct HttpFeedSource {
    client: Client,
}

impl HttpFeedSource {
    pub fn new(timeout: Duration) -> Result<Self, FeedFetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| FeedFetchError::Transport(err.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(
        &self,
        feed: &FeedConfig,
        limit: usize,
    ) -> Result<Vec<FeedEntry>, FeedFetchError> {
        let response = self
            .client
            .get(&feed.url)
            .send()
            .await
            .map_err(|err| FeedFetchError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedFetchError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| FeedFetchError::Transport(err.to_string()))?;
        parse_entries(&body, limit)
    }
}

/// Parse an RSS or Atom document into at most `limit` entries.
pub fn parse_entries(document: &[u8], limit: usize) -> Result<Vec<FeedEntry>, FeedFetchError> {
    let feed = parser::parse(document).map_err(|err| FeedFetchError::Parse(err.to_string()))?;

    Ok(feed
        .entries
        .into_iter()
        .take(limit)
        .map(|entry| FeedEntry {
            title: entry
                .title
                .map(|text| text.content.trim().to_string())
                .unwrap_or_default(),
            link: entry
                .links
                .into_iter()
                .next()
                .map(|link| link.href)
                .unwrap_or_default(),
            date: entry
                .published
                .or(entry.updated)
                .map(|date| date.to_rfc3339()),
        })
        .collect())
}
