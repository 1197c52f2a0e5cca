#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use unsolved::application::articles::{ArticleService, GenerationOptions};
use unsolved::application::generator::{CompletionRequest, GeneratorError, TextGenerator};
use unsolved::application::store::{KeyValueStore, SetOptions, StoreError};
use unsolved::cache::ArticleCachePolicy;
use unsolved::domain::topics::TopicCatalog;
use unsolved::infra::store::MemoryStore;

pub const MODEL: &str = "test-model";

pub fn section(heading: &str, paragraphs: &[&str]) -> Value {
    json!({ "heading": heading, "paragraphs": paragraphs })
}

pub fn article_payload(sections: Vec<Value>) -> Value {
    json!({
        "id": "dark-matter",
        "title": "The invisible scaffolding",
        "subtitle": "Most of the mass in the universe is missing",
        "readingMinutes": 7,
        "hero": { "unsplashQuery": "galaxy cluster", "alt": "A galaxy cluster" },
        "sections": sections,
        "keyTakeaways": ["one", "two", "three"],
        "sources": [
            { "label": "NASA", "url": "https://science.nasa.gov/dark-matter" },
            { "label": "CERN", "url": "https://home.cern/science/physics/dark-matter" }
        ]
    })
}

pub fn valid_payload() -> String {
    article_payload(vec![
        section("What we see", &["Galaxies spin too fast."]),
        section("What we don't know", &["What the particle is."]),
        section("How to find out", &["Underground detectors."]),
    ])
    .to_string()
}

/// Generator that replays scripted replies, repeating the last one.
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String, GeneratorError>>>,
    last: Mutex<Option<String>>,
    delay: Duration,
    calls: AtomicUsize,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedGenerator {
    pub fn replying(body: impl Into<String>) -> Self {
        Self::with_replies(vec![Ok(body.into())])
    }

    pub fn failing() -> Self {
        Self::with_replies(vec![Err(GeneratorError::Transport(
            "connection reset".to_string(),
        ))])
    }

    pub fn with_replies(replies: Vec<Result<String, GeneratorError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            last: Mutex::new(None),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GeneratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Ok(body)) => {
                *self.last.lock().unwrap() = Some(body.clone());
                Ok(body)
            }
            Some(Err(err)) => {
                *self.last.lock().unwrap() = None;
                Err(err)
            }
            None => match self.last.lock().unwrap().clone() {
                Some(body) => Ok(body),
                None => Err(GeneratorError::Transport("connection reset".to_string())),
            },
        }
    }
}

/// Memory store that counts every operation.
#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryStore,
    pub gets: AtomicUsize,
    pub sets: AtomicUsize,
    pub deletes: AtomicUsize,
}

impl CountingStore {
    pub fn operations(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
            + self.sets.load(Ordering::SeqCst)
            + self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyValueStore for CountingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, options: SetOptions) -> Result<bool, StoreError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value, options).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(key).await
    }

    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, StoreError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_if_equals(key, expected).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }
}

/// Store whose backend is unreachable.
pub struct UnreachableStore;

#[async_trait]
impl KeyValueStore for UnreachableStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::unavailable("connection refused"))
    }

    async fn set(
        &self,
        _key: &str,
        _value: &str,
        _options: SetOptions,
    ) -> Result<bool, StoreError> {
        Err(StoreError::unavailable("connection refused"))
    }

    async fn delete(&self, _key: &str) -> Result<(), StoreError> {
        Err(StoreError::unavailable("connection refused"))
    }

    async fn delete_if_equals(&self, _key: &str, _expected: &str) -> Result<bool, StoreError> {
        Err(StoreError::unavailable("connection refused"))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::unavailable("connection refused"))
    }
}

pub fn article_service(
    store: Arc<dyn KeyValueStore>,
    generator: Arc<dyn TextGenerator>,
) -> ArticleService {
    article_service_with_policy(store, generator, ArticleCachePolicy::default())
}

pub fn article_service_with_policy(
    store: Arc<dyn KeyValueStore>,
    generator: Arc<dyn TextGenerator>,
    policy: ArticleCachePolicy,
) -> ArticleService {
    ArticleService::new(
        store,
        generator,
        Arc::new(TopicCatalog::builtin().clone()),
        policy,
        GenerationOptions {
            model: MODEL.to_string(),
            temperature: 0.7,
        },
    )
}
