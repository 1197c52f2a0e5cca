//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::application::news::FeedConfig;

pub use cli::{
    CliArgs, Command, GenerationOverrides, ServeArgs, ServeOverrides, StoreOverride, WarmArgs,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "unsolved";
const ENV_PREFIX: &str = "UNSOLVED";

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;

const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";
const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 45;

const DEFAULT_CACHE_VERSION: &str = "v1";
const DEFAULT_LOCK_TTL_SECS: u64 = 60;
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_POLL_ATTEMPTS: u32 = 12;

const DEFAULT_NEWS_TTL_SECS: u64 = 15 * 60;
const DEFAULT_NEWS_ITEMS_PER_FEED: usize = 8;
const DEFAULT_NEWS_CACHE_KEY: &str = "news:v1";
const DEFAULT_NEWS_FETCH_TIMEOUT_SECS: u64 = 10;

fn default_feeds() -> Vec<FeedConfig> {
    vec![FeedConfig {
        key: "arxiv-ai".to_string(),
        name: "arXiv cs.AI".to_string(),
        url: "https://rss.arxiv.org/rss/cs.AI".to_string(),
    }]
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub store: StoreSettings,
    pub generation: GenerationSettings,
    pub articles: ArticleSettings,
    pub news: NewsSettings,
    pub catalog: CatalogSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone, Default)]
pub struct StoreSettings {
    /// `None` selects the process-local store.
    pub url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub api_base: Url,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ArticleSettings {
    pub cache_version: String,
    pub lock_ttl: Duration,
    pub poll_interval: Duration,
    pub poll_attempts: u32,
}

#[derive(Debug, Clone)]
pub struct NewsSettings {
    pub ttl: Duration,
    pub items_per_feed: usize,
    pub cache_key: String,
    pub fetch_timeout: Duration,
    pub feeds: Vec<FeedConfig>,
}

#[derive(Debug, Clone, Default)]
pub struct CatalogSettings {
    /// TOML file replacing the built-in catalog.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Warm(args)) => raw.apply_warm_overrides(args),
        Some(Command::Topics) => {}
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    store: RawStoreSettings,
    generation: RawGenerationSettings,
    articles: RawArticleSettings,
    news: RawNewsSettings,
    catalog: RawCatalogSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }

        self.apply_store_override(&overrides.store);
        self.apply_generation_overrides(&overrides.generation);
    }

    fn apply_warm_overrides(&mut self, args: &WarmArgs) {
        if let Some(level) = args.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        self.apply_store_override(&args.store);
        self.apply_generation_overrides(&args.generation);
    }

    fn apply_store_override(&mut self, overrides: &StoreOverride) {
        if let Some(url) = overrides.store_url.as_ref() {
            self.store.url = Some(url.clone());
        }
    }

    fn apply_generation_overrides(&mut self, overrides: &GenerationOverrides) {
        if let Some(model) = overrides.model.as_ref() {
            self.generation.model = Some(model.clone());
        }
        if let Some(base) = overrides.api_base.as_ref() {
            self.generation.api_base = Some(base.clone());
        }
        if let Some(key) = overrides.api_key.as_ref() {
            self.generation.api_key = Some(key.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            store,
            generation,
            articles,
            news,
            catalog,
        } = raw;

        let generation = build_generation_settings(generation)?;
        let articles = build_article_settings(articles)?;
        // A winner still waiting on the provider must not outlive its lock.
        if articles.lock_ttl <= generation.request_timeout {
            return Err(LoadError::invalid(
                "articles.lock_ttl_seconds",
                format!(
                    "{}s must exceed generation.request_timeout_seconds ({}s)",
                    articles.lock_ttl.as_secs(),
                    generation.request_timeout.as_secs()
                ),
            ));
        }

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            store: build_store_settings(store),
            generation,
            articles,
            news: build_news_settings(news)?,
            catalog: CatalogSettings {
                path: catalog.path,
            },
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.host", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);

    Ok(ServerSettings {
        addr,
        graceful_shutdown: positive_secs(graceful_secs, "server.graceful_shutdown_seconds")?,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_store_settings(store: RawStoreSettings) -> StoreSettings {
    StoreSettings {
        url: non_blank(store.url),
    }
}

fn build_generation_settings(
    generation: RawGenerationSettings,
) -> Result<GenerationSettings, LoadError> {
    let api_base = generation
        .api_base
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
    let api_base = Url::parse(api_base.trim())
        .map_err(|err| LoadError::invalid("generation.api_base", err.to_string()))?;

    let model = non_blank(generation.model).unwrap_or_else(|| DEFAULT_MODEL.to_string());

    let temperature = generation.temperature.unwrap_or(DEFAULT_TEMPERATURE);
    if !(0.0..=2.0).contains(&temperature) {
        return Err(LoadError::invalid(
            "generation.temperature",
            format!("{temperature} is outside 0.0..=2.0"),
        ));
    }

    let timeout_secs = generation
        .request_timeout_seconds
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

    Ok(GenerationSettings {
        api_base,
        api_key: non_blank(generation.api_key),
        model,
        temperature,
        request_timeout: positive_secs(timeout_secs, "generation.request_timeout_seconds")?,
    })
}

fn build_article_settings(articles: RawArticleSettings) -> Result<ArticleSettings, LoadError> {
    let cache_version = articles
        .cache_version
        .map(|value| value.trim().to_string())
        .unwrap_or_else(|| DEFAULT_CACHE_VERSION.to_string());
    if cache_version.is_empty() {
        return Err(LoadError::invalid(
            "articles.cache_version",
            "must not be empty",
        ));
    }
    if cache_version.contains(':') {
        return Err(LoadError::invalid(
            "articles.cache_version",
            "must not contain `:`",
        ));
    }

    let lock_ttl_secs = articles.lock_ttl_seconds.unwrap_or(DEFAULT_LOCK_TTL_SECS);
    let poll_interval_ms = articles.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS);
    if poll_interval_ms == 0 {
        return Err(LoadError::invalid(
            "articles.poll_interval_ms",
            "must be greater than zero",
        ));
    }

    Ok(ArticleSettings {
        cache_version,
        lock_ttl: positive_secs(lock_ttl_secs, "articles.lock_ttl_seconds")?,
        poll_interval: Duration::from_millis(poll_interval_ms),
        poll_attempts: articles.poll_attempts.unwrap_or(DEFAULT_POLL_ATTEMPTS),
    })
}

fn build_news_settings(news: RawNewsSettings) -> Result<NewsSettings, LoadError> {
    let ttl_secs = news.ttl_seconds.unwrap_or(DEFAULT_NEWS_TTL_SECS);
    let fetch_timeout_secs = news
        .fetch_timeout_seconds
        .unwrap_or(DEFAULT_NEWS_FETCH_TIMEOUT_SECS);

    let items_per_feed = news.items_per_feed.unwrap_or(DEFAULT_NEWS_ITEMS_PER_FEED);
    if items_per_feed == 0 {
        return Err(LoadError::invalid(
            "news.items_per_feed",
            "must be greater than zero",
        ));
    }

    let cache_key = non_blank(news.cache_key).unwrap_or_else(|| DEFAULT_NEWS_CACHE_KEY.to_string());

    let feeds = news.feeds.unwrap_or_else(default_feeds);
    for feed in &feeds {
        if feed.key.trim().is_empty() || feed.name.trim().is_empty() {
            return Err(LoadError::invalid(
                "news.feeds",
                "every feed needs a key and a name",
            ));
        }
        Url::parse(&feed.url).map_err(|err| {
            LoadError::invalid("news.feeds", format!("feed `{}` url: {err}", feed.key))
        })?;
    }

    Ok(NewsSettings {
        ttl: positive_secs(ttl_secs, "news.ttl_seconds")?,
        items_per_feed,
        cache_key,
        fetch_timeout: positive_secs(fetch_timeout_secs, "news.fetch_timeout_seconds")?,
        feeds,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStoreSettings {
    url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawGenerationSettings {
    api_base: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawArticleSettings {
    cache_version: Option<String>,
    lock_ttl_seconds: Option<u64>,
    poll_interval_ms: Option<u64>,
    poll_attempts: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawNewsSettings {
    ttl_seconds: Option<u64>,
    items_per_feed: Option<usize>,
    cache_key: Option<String>,
    fetch_timeout_seconds: Option<u64>,
    feeds: Option<Vec<FeedConfig>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCatalogSettings {
    path: Option<PathBuf>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn positive_secs(value: u64, key: &'static str) -> Result<Duration, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_secs(value))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

#[cfg(test)]
mod tests;
