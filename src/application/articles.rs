//! Article resolution: cache-aside with a single-writer generation lock.
//!
//! For one `(topic, style)` pair:
//! 1. Return the cached article when present.
//! 2. Otherwise try to create the lock entry atomically. The winner generates.
//! 3. Followers poll the article entry for a bounded time, then fall through
//!    and generate on their own without retrying the lock.
//!
//! Generated articles are sanitized, stamped, validated and stored permanently.
//! A follower that falls through may race the winner; both writes are valid
//! articles for the same key, so last write wins.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::cache::{ArticleCachePolicy, ArticleKey};
use crate::domain::article::{Article, ArticleMeta, ValidationError};
use crate::domain::sanitize::sanitize_payload;
use crate::domain::style::ArticleStyle;
use crate::domain::topics::{TopicCatalog, TopicDescriptor, normalize_topic_id};

use super::generator::{GeneratorError, TextGenerator};
use super::prompt;
use super::store::{KeyValueStore, SetOptions, StoreError};

const LOG_TARGET: &str = "unsolved::articles";

const METRIC_CACHE_HIT: &str = "unsolved_article_cache_hit_total";
const METRIC_CACHE_MISS: &str = "unsolved_article_cache_miss_total";
const METRIC_LOCK_CONTENDED: &str = "unsolved_article_lock_contended_total";
const METRIC_FOLLOWER_FALLTHROUGH: &str = "unsolved_article_follower_fallthrough_total";
const METRIC_GENERATED: &str = "unsolved_article_generated_total";
const METRIC_GENERATION_FAILED: &str = "unsolved_article_generation_failed_total";
const METRIC_GENERATION_MS: &str = "unsolved_article_generation_ms";

/// Why a single generation attempt produced no article.
#[derive(Debug, Error)]
pub enum GenerationFailure {
    #[error("generation provider call failed")]
    Provider(#[source] GeneratorError),
    #[error("provider output is not valid JSON")]
    Parse(#[source] serde_json::Error),
    #[error("no section survived sanitization")]
    EmptyContent,
    #[error("generated article failed validation")]
    SchemaInvalid(#[source] ValidationError),
}

impl GenerationFailure {
    /// Stable label used for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Provider(_) => "provider",
            Self::Parse(_) => "parse",
            Self::EmptyContent => "empty_content",
            Self::SchemaInvalid(_) => "schema_invalid",
        }
    }
}

#[derive(Debug, Error)]
pub enum ArticleError {
    #[error("unknown topic `{0}`")]
    UnknownTopic(String),
    #[error("article generation failed")]
    GenerationFailed(#[from] GenerationFailure),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Model parameters shared by every generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
    pub model: String,
    pub temperature: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedArticle {
    pub article: Article,
    pub from_cache: bool,
}

impl ResolvedArticle {
    fn cached(article: Article) -> Self {
        Self {
            article,
            from_cache: true,
        }
    }

    fn fresh(article: Article) -> Self {
        Self {
            article,
            from_cache: false,
        }
    }
}

#[derive(Clone)]
pub struct ArticleService {
    store: Arc<dyn KeyValueStore>,
    generator: Arc<dyn TextGenerator>,
    catalog: Arc<TopicCatalog>,
    policy: ArticleCachePolicy,
    options: GenerationOptions,
}

impl ArticleService {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        generator: Arc<dyn TextGenerator>,
        catalog: Arc<TopicCatalog>,
        policy: ArticleCachePolicy,
        options: GenerationOptions,
    ) -> Self {
        Self {
            store,
            generator,
            catalog,
            policy,
            options,
        }
    }

    pub fn catalog(&self) -> &TopicCatalog {
        &self.catalog
    }

    /// Return the article for `(topic_id, style)`, generating it at most once per lock window.
    #[instrument(level = "debug", skip(self), fields(style = %style))]
    pub async fn resolve(
        &self,
        topic_id: &str,
        style: ArticleStyle,
    ) -> Result<ResolvedArticle, ArticleError> {
        let topic_id = normalize_topic_id(topic_id);
        let Some(topic) = self.catalog.get(&topic_id) else {
            debug!(target: LOG_TARGET, topic = %topic_id, "Unknown topic requested");
            return Err(ArticleError::UnknownTopic(topic_id));
        };

        let key = ArticleKey::new(self.policy.cache_version.as_str(), topic.id.as_str(), style);

        if let Some(article) = self.read_cached(&key).await? {
            counter!(METRIC_CACHE_HIT).increment(1);
            debug!(target: LOG_TARGET, key = %key, "Article served from cache");
            return Ok(ResolvedArticle::cached(article));
        }
        counter!(METRIC_CACHE_MISS).increment(1);

        let lock_key = key.lock_key();
        let token = Uuid::new_v4().to_string();
        let acquired = self
            .store
            .set(&lock_key, &token, SetOptions::exclusive(self.policy.lock_ttl))
            .await?;

        if !acquired {
            counter!(METRIC_LOCK_CONTENDED).increment(1);
            debug!(target: LOG_TARGET, key = %key, "Generation in progress elsewhere, waiting");

            if let Some(article) = self.wait_for_winner(&key).await? {
                return Ok(ResolvedArticle::cached(article));
            }

            counter!(METRIC_FOLLOWER_FALLTHROUGH).increment(1);
            warn!(
                target: LOG_TARGET,
                key = %key,
                waited_ms = self.policy.follower_budget().as_millis() as u64,
                "Article did not appear in time, generating without the lock"
            );
            let article = self.generate_and_store(topic, &key).await?;
            return Ok(ResolvedArticle::fresh(article));
        }

        debug!(target: LOG_TARGET, key = %key, lock_token = %token, "Generation lock acquired");
        let outcome = self.generate_and_store(topic, &key).await;
        self.release_lock(&lock_key, &token).await;
        outcome.map(ResolvedArticle::fresh)
    }

    /// Cached article, if any. Unreadable entries count as a miss and get overwritten later.
    async fn read_cached(&self, key: &ArticleKey) -> Result<Option<Article>, StoreError> {
        let Some(raw) = self.store.get(&key.cache_key()).await? else {
            return Ok(None);
        };

        match serde_json::from_str::<Article>(&raw) {
            Ok(article) => Ok(Some(article)),
            Err(err) => {
                warn!(
                    target: LOG_TARGET,
                    key = %key,
                    error = %err,
                    "Discarding unreadable cached article"
                );
                Ok(None)
            }
        }
    }

    async fn wait_for_winner(&self, key: &ArticleKey) -> Result<Option<Article>, StoreError> {
        for attempt in 1..=self.policy.poll_attempts {
            sleep(self.policy.poll_interval).await;
            if let Some(article) = self.read_cached(key).await? {
                debug!(target: LOG_TARGET, key = %key, attempt, "Article appeared while waiting");
                return Ok(Some(article));
            }
        }
        Ok(None)
    }

    async fn generate_and_store(
        &self,
        topic: &TopicDescriptor,
        key: &ArticleKey,
    ) -> Result<Article, ArticleError> {
        let started_at = Instant::now();

        let article = match self.generate(topic, key).await {
            Ok(article) => article,
            Err(failure) => {
                counter!(METRIC_GENERATION_FAILED, "reason" => failure.reason()).increment(1);
                warn!(
                    target: LOG_TARGET,
                    key = %key,
                    reason = failure.reason(),
                    error = %failure,
                    detail = ?std::error::Error::source(&failure).map(ToString::to_string),
                    "Article generation failed"
                );
                return Err(failure.into());
            }
        };

        let payload = serde_json::to_string(&article).map_err(StoreError::serialization)?;
        self.store
            .set(&key.cache_key(), &payload, SetOptions::permanent())
            .await?;

        let elapsed_ms = started_at.elapsed().as_secs_f64() * 1000.0;
        counter!(METRIC_GENERATED).increment(1);
        histogram!(METRIC_GENERATION_MS).record(elapsed_ms);
        info!(
            target: LOG_TARGET,
            key = %key,
            model = %self.options.model,
            sections = article.sections.len(),
            elapsed_ms,
            "Article generated and cached"
        );

        Ok(article)
    }

    async fn generate(
        &self,
        topic: &TopicDescriptor,
        key: &ArticleKey,
    ) -> Result<Article, GenerationFailure> {
        let request = prompt::build_request(
            topic,
            key.style,
            &self.options.model,
            self.options.temperature,
        );
        let raw = self
            .generator
            .complete(&request)
            .await
            .map_err(GenerationFailure::Provider)?;

        let payload: Value = serde_json::from_str(&raw).map_err(GenerationFailure::Parse)?;
        let draft = sanitize_payload(&payload, topic);
        if draft.sections.is_empty() {
            return Err(GenerationFailure::EmptyContent);
        }

        let meta = ArticleMeta {
            generated_at: now_rfc3339(),
            model: self.options.model.clone(),
            style: key.style,
            cache_version: key.version.clone(),
        };
        draft
            .with_meta(meta)
            .validate()
            .map_err(GenerationFailure::SchemaInvalid)
    }

    /// Delete the lock only while it still carries our token.
    /// After expiry it may belong to another writer.
    async fn release_lock(&self, lock_key: &str, token: &str) {
        match self.store.delete_if_equals(lock_key, token).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(
                    target: LOG_TARGET,
                    lock_key,
                    "Generation lock expired before release; left to its current holder"
                );
            }
            Err(err) => {
                warn!(
                    target: LOG_TARGET,
                    lock_key,
                    error = %err,
                    "Failed to release generation lock; it will expire"
                );
            }
        }
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}
