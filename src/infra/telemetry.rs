use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "unsolved_article_cache_hit_total",
            Unit::Count,
            "Article requests answered from the shared cache."
        );
        describe_counter!(
            "unsolved_article_cache_miss_total",
            Unit::Count,
            "Article requests that found no cached entry."
        );
        describe_counter!(
            "unsolved_article_lock_contended_total",
            Unit::Count,
            "Misses that lost the generation lock and waited for another writer."
        );
        describe_counter!(
            "unsolved_article_follower_fallthrough_total",
            Unit::Count,
            "Waiting requests that exhausted their poll budget and generated themselves."
        );
        describe_counter!(
            "unsolved_article_generated_total",
            Unit::Count,
            "Articles generated, validated and cached."
        );
        describe_counter!(
            "unsolved_article_generation_failed_total",
            Unit::Count,
            "Generation attempts that produced no article, by reason."
        );
        describe_histogram!(
            "unsolved_article_generation_ms",
            Unit::Milliseconds,
            "Latency of a successful generation including the cache write."
        );
        describe_counter!(
            "unsolved_news_cache_hit_total",
            Unit::Count,
            "News requests answered from the cached aggregate."
        );
        describe_counter!(
            "unsolved_news_feed_failed_total",
            Unit::Count,
            "Feed fetches that failed and were replaced by a placeholder."
        );
    });
}
