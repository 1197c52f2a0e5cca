use super::*;
use crate::domain::style::ArticleStyle;

#[test]
fn defaults_resolve_without_any_source() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.to_string(), "127.0.0.1:3000");
    assert_eq!(settings.server.graceful_shutdown, Duration::from_secs(30));
    assert!(settings.store.url.is_none());
    assert_eq!(
        settings.generation.api_base.as_str(),
        "https://api.groq.com/openai/v1"
    );
    assert_eq!(settings.generation.model, "llama-3.1-8b-instant");
    assert!(settings.generation.api_key.is_none());
    assert_eq!(settings.articles.cache_version, "v1");
    assert_eq!(settings.generation.request_timeout, Duration::from_secs(45));
    assert_eq!(settings.articles.lock_ttl, Duration::from_secs(60));
    assert_eq!(settings.articles.poll_interval, Duration::from_millis(1000));
    assert_eq!(settings.articles.poll_attempts, 12);
    assert_eq!(settings.news.ttl, Duration::from_secs(900));
    assert_eq!(settings.news.items_per_feed, 8);
    assert_eq!(settings.news.cache_key, "news:v1");
    assert_eq!(settings.news.feeds.len(), 1);
    assert_eq!(settings.news.feeds[0].url, "https://rss.arxiv.org/rss/cs.AI");
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());
    raw.generation.model = Some("from-file".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        generation: GenerationOverrides {
            model: Some("from-cli".to_string()),
            ..Default::default()
        },
        store: StoreOverride {
            store_url: Some("redis://127.0.0.1:6379".to_string()),
        },
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.generation.model, "from-cli");
    assert_eq!(settings.store.url.as_deref(), Some("redis://127.0.0.1:6379"));
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn blank_store_url_selects_memory_store() {
    let mut raw = RawSettings::default();
    raw.store.url = Some("   ".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.store.url.is_none());
}

#[test]
fn cache_version_must_be_a_single_key_segment() {
    for bad in ["", "  ", "v1:beta"] {
        let mut raw = RawSettings::default();
        raw.articles.cache_version = Some(bad.to_string());
        match Settings::from_raw(raw) {
            Err(LoadError::Invalid { key, .. }) => assert_eq!(key, "articles.cache_version"),
            other => panic!("expected invalid cache_version for {bad:?}, got {other:?}"),
        }
    }
}

#[test]
fn rejects_out_of_range_values() {
    let mut raw = RawSettings::default();
    raw.generation.temperature = Some(2.5);
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "generation.temperature",
            ..
        })
    ));

    let mut raw = RawSettings::default();
    raw.articles.lock_ttl_seconds = Some(0);
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "articles.lock_ttl_seconds",
            ..
        })
    ));

    let mut raw = RawSettings::default();
    raw.generation.request_timeout_seconds = Some(90);
    match Settings::from_raw(raw) {
        Err(LoadError::Invalid { key, reason }) => {
            assert_eq!(key, "articles.lock_ttl_seconds");
            assert!(reason.contains("90s"), "{reason}");
        }
        other => panic!("expected lock ttl below request timeout to fail, got {other:?}"),
    }

    let mut raw = RawSettings::default();
    raw.server.port = Some(0);
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "server.port",
            ..
        })
    ));

    let mut raw = RawSettings::default();
    raw.news.feeds = Some(vec![FeedConfig {
        key: "broken".to_string(),
        name: "Broken".to_string(),
        url: "not a url".to_string(),
    }]);
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "news.feeds",
            ..
        })
    ));
}

#[test]
fn settings_file_is_layered_under_cli() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("unsolved.toml");
    std::fs::write(
        &path,
        r#"
[server]
port = 8080

[articles]
cache_version = "v2"
poll_attempts = 3

[[news.feeds]]
key = "nature"
name = "Nature"
url = "https://www.nature.com/nature.rss"
"#,
    )
    .expect("write config");

    let args = CliArgs::parse_from([
        "unsolved",
        "--config-file",
        path.to_str().expect("utf-8 path"),
        "serve",
        "--server-port",
        "9090",
    ]);
    let settings = load(&args).expect("settings load");

    assert_eq!(settings.server.addr.port(), 9090);
    assert_eq!(settings.articles.cache_version, "v2");
    assert_eq!(settings.articles.poll_attempts, 3);
    assert_eq!(settings.news.feeds.len(), 1);
    assert_eq!(settings.news.feeds[0].name, "Nature");
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["unsolved"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_warm_arguments() {
    let args = CliArgs::parse_from([
        "unsolved",
        "warm",
        "--topic",
        "dark-matter",
        "--topic",
        "dark-energy",
        "--style",
        "eli12",
        "--style",
        "Technical",
        "--concurrency",
        "64",
        "--store-url",
        "redis://cache:6379",
    ]);

    match args.command.expect("warm command") {
        Command::Warm(warm) => {
            assert_eq!(warm.topics, ["dark-matter", "dark-energy"]);
            assert_eq!(
                warm.effective_styles(),
                [ArticleStyle::Eli12, ArticleStyle::Technical]
            );
            assert_eq!(warm.effective_concurrency(), 16);
            assert_eq!(warm.store.store_url.as_deref(), Some("redis://cache:6379"));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn warm_defaults_to_default_style_and_two_workers() {
    let args = CliArgs::parse_from(["unsolved", "warm", "--concurrency", "0"]);
    match args.command.expect("warm command") {
        Command::Warm(warm) => {
            assert!(warm.topics.is_empty());
            assert_eq!(warm.effective_styles(), [ArticleStyle::Default]);
            assert_eq!(warm.effective_concurrency(), 1);
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn warm_rejects_unknown_style() {
    let result = CliArgs::try_parse_from(["unsolved", "warm", "--style", "haiku"]);
    assert!(result.is_err());
}

#[test]
fn parse_topics_command() {
    let args = CliArgs::parse_from(["unsolved", "topics"]);
    assert!(matches!(args.command, Some(Command::Topics)));
}
