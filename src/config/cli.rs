use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

use crate::domain::style::ArticleStyle;

pub(crate) const DEFAULT_WARM_CONCURRENCY: usize = 2;
pub(crate) const MAX_WARM_CONCURRENCY: usize = 16;

/// Command-line arguments for the unsolved binary.
#[derive(Debug, Parser)]
#[command(
    name = "unsolved",
    version,
    about = "Explainer articles for open scientific mysteries"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "UNSOLVED_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath
    )]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP service.
    Serve(Box<ServeArgs>),
    /// Generate and cache articles ahead of traffic.
    Warm(WarmArgs),
    /// Print the topic catalog.
    Topics,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct StoreOverride {
    /// Override the key-value store URL (redis://host:port).
    #[arg(long = "store-url", value_name = "URL", value_hint = ValueHint::Url)]
    pub store_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct GenerationOverrides {
    /// Override the generation model identifier.
    #[arg(long = "generation-model", value_name = "MODEL")]
    pub model: Option<String>,

    /// Override the OpenAI-compatible API base URL.
    #[arg(long = "generation-api-base", value_name = "URL", value_hint = ValueHint::Url)]
    pub api_base: Option<String>,

    /// Provider API key.
    #[arg(
        long = "generation-api-key",
        env = "GROQ_API_KEY",
        hide_env_values = true,
        value_name = "KEY"
    )]
    pub api_key: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub store: StoreOverride,

    #[command(flatten)]
    pub generation: GenerationOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Clone)]
pub struct WarmArgs {
    #[command(flatten)]
    pub store: StoreOverride,

    #[command(flatten)]
    pub generation: GenerationOverrides,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Topic id to warm; repeat for several. Defaults to every topic.
    #[arg(long = "topic", value_name = "ID")]
    pub topics: Vec<String>,

    /// Style to warm; repeat for several. Defaults to `default`.
    #[arg(long = "style", value_name = "STYLE", value_parser = parse_style)]
    pub styles: Vec<ArticleStyle>,

    /// Maximum number of concurrent generations (1-16).
    #[arg(long, default_value_t = DEFAULT_WARM_CONCURRENCY)]
    pub concurrency: usize,
}

impl WarmArgs {
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.clamp(1, MAX_WARM_CONCURRENCY)
    }

    pub fn effective_styles(&self) -> Vec<ArticleStyle> {
        if self.styles.is_empty() {
            vec![ArticleStyle::Default]
        } else {
            self.styles.clone()
        }
    }
}

fn parse_style(value: &str) -> Result<ArticleStyle, String> {
    ArticleStyle::parse(value).ok_or_else(|| {
        let known: Vec<_> = ArticleStyle::ALL.iter().map(|style| style.as_str()).collect();
        format!("unknown style `{value}` (expected one of: {})", known.join(", "))
    })
}
