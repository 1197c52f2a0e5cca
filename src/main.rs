use std::{future::IntoFuture, process, sync::Arc};

use futures::stream::{self, StreamExt};
use tokio::signal;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;
use unsolved::{
    application::{
        articles::{ArticleService, GenerationOptions},
        error::AppError,
        generator::TextGenerator,
        news::{NewsPolicy, NewsService},
        store::KeyValueStore,
    },
    cache::ArticleCachePolicy,
    config,
    domain::{style::ArticleStyle, topics::TopicCatalog},
    infra::{
        error::InfraError,
        feeds::HttpFeedSource,
        http::{self, HttpState},
        llm::OpenAiCompatibleGenerator,
        store, telemetry,
    },
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    if let config::Command::Topics = command {
        return run_topics(&settings);
    }

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Warm(args) => run_warm(settings, args).await,
        config::Command::Topics => Ok(()),
    }
}

fn load_catalog(settings: &config::Settings) -> Result<Arc<TopicCatalog>, AppError> {
    match settings.catalog.path.as_ref() {
        Some(path) => {
            let source = std::fs::read_to_string(path)
                .map_err(|err| AppError::from(InfraError::from(err)))?;
            Ok(Arc::new(TopicCatalog::from_toml(&source)?))
        }
        None => Ok(Arc::new(TopicCatalog::builtin().clone())),
    }
}

fn run_topics(settings: &config::Settings) -> Result<(), AppError> {
    let catalog = load_catalog(settings)?;
    for topic in catalog.iter() {
        println!("{}\t{}\t{}", topic.id, topic.category.as_str(), topic.title);
    }
    Ok(())
}

fn build_article_service(
    settings: &config::Settings,
    store: Arc<dyn KeyValueStore>,
) -> Result<ArticleService, AppError> {
    let catalog = load_catalog(settings)?;
    let generator = OpenAiCompatibleGenerator::from_settings(&settings.generation)
        .map_err(|err| AppError::from(InfraError::configuration(err.to_string())))?;
    if settings.generation.api_key.is_none() {
        warn!(
            target: "unsolved::generation",
            "No generation api key configured; cache misses will fail"
        );
    }
    let generator: Arc<dyn TextGenerator> = Arc::new(generator);

    Ok(ArticleService::new(
        store,
        generator,
        catalog,
        ArticleCachePolicy::from(&settings.articles),
        GenerationOptions {
            model: settings.generation.model.clone(),
            temperature: settings.generation.temperature,
        },
    ))
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let store = store::connect(&settings.store)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    let articles = build_article_service(&settings, store.clone())?;

    let feeds = HttpFeedSource::new(settings.news.fetch_timeout)
        .map_err(|err| AppError::from(InfraError::configuration(err.to_string())))?;
    let news = NewsService::new(
        store.clone(),
        Arc::new(feeds),
        NewsPolicy::from(&settings.news),
    );

    let state = HttpState {
        articles: Arc::new(articles),
        news: Arc::new(news),
        store,
    };
    serve_http(&settings, state).await
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target: "unsolved::http",
        addr = %settings.server.addr,
        "Listening"
    );

    let grace = settings.server.graceful_shutdown;
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .into_future();

    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))
        }
        _ = async {
            shutdown_signal().await;
            tokio::time::sleep(grace).await;
        } => {
            warn!(
                target: "unsolved::http",
                grace_secs = grace.as_secs(),
                "Graceful shutdown timed out; dropping open connections"
            );
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

async fn run_warm(settings: config::Settings, args: config::WarmArgs) -> Result<(), AppError> {
    let store = store::connect(&settings.store)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    let service = build_article_service(&settings, store)?;

    let topics: Vec<String> = if args.topics.is_empty() {
        service.catalog().iter().map(|topic| topic.id.clone()).collect()
    } else {
        args.topics.clone()
    };
    let styles = args.effective_styles();
    let pairs: Vec<(String, ArticleStyle)> = topics
        .iter()
        .flat_map(|topic| styles.iter().map(move |style| (topic.clone(), *style)))
        .collect();
    let total = pairs.len();
    let concurrency = args.effective_concurrency();

    info!(target: "unsolved::warm", total, concurrency, "Starting warm-up");

    let failures = stream::iter(pairs)
        .map(|(topic, style)| {
            let service = service.clone();
            async move {
                let outcome = service.resolve(&topic, style).await;
                (topic, style, outcome)
            }
        })
        .buffer_unordered(concurrency)
        .fold(0usize, |failures, (topic, style, outcome)| async move {
            match outcome {
                Ok(resolved) => {
                    info!(
                        target: "unsolved::warm",
                        topic = %topic,
                        style = %style,
                        from_cache = resolved.from_cache,
                        "Article ready"
                    );
                    failures
                }
                Err(err) => {
                    error!(
                        target: "unsolved::warm",
                        topic = %topic,
                        style = %style,
                        error = %err,
                        "Article warm-up failed"
                    );
                    failures + 1
                }
            }
        })
        .await;

    info!(
        target: "unsolved::warm",
        total,
        failed = failures,
        "Warm-up finished"
    );

    if failures > 0 {
        return Err(AppError::unexpected(format!(
            "{failures} of {total} articles could not be warmed"
        )));
    }
    Ok(())
}
