//! Article cache layout.
//!
//! Every instance shares one key-value store. Articles are stored permanently
//! under a versioned key; generation is serialized per key by a short-lived
//! lock entry:
//!
//! ```toml
//! [articles]
//! cache_version = "v1"
//! lock_ttl_seconds = 60
//! poll_interval_ms = 1000
//! poll_attempts = 12
//! ```

mod config;
mod keys;
pub(crate) mod lock;

pub use config::ArticleCachePolicy;
pub use keys::ArticleKey;
