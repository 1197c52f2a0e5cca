//! Article cache policy.
//!
//! Controls the cache namespace and the generation lock protocol via the
//! `[articles]` section of `unsolved.toml`.

use std::time::Duration;

const DEFAULT_CACHE_VERSION: &str = "v1";
const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(60);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);
const DEFAULT_POLL_ATTEMPTS: u32 = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleCachePolicy {
    /// Namespace prefix; bump to invalidate every cached article at once.
    pub cache_version: String,
    /// Upper bound on how long a generation attempt holds exclusivity.
    pub lock_ttl: Duration,
    /// Delay between follower polls of the article entry.
    pub poll_interval: Duration,
    /// Number of follower polls before falling through to generation.
    pub poll_attempts: u32,
}

impl Default for ArticleCachePolicy {
    fn default() -> Self {
        Self {
            cache_version: DEFAULT_CACHE_VERSION.to_string(),
            lock_ttl: DEFAULT_LOCK_TTL,
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_attempts: DEFAULT_POLL_ATTEMPTS,
        }
    }
}

impl From<&crate::config::ArticleSettings> for ArticleCachePolicy {
    fn from(settings: &crate::config::ArticleSettings) -> Self {
        Self {
            cache_version: settings.cache_version.clone(),
            lock_ttl: settings.lock_ttl,
            poll_interval: settings.poll_interval,
            poll_attempts: settings.poll_attempts,
        }
    }
}

impl ArticleCachePolicy {
    /// Longest a follower waits before generating on its own.
    pub fn follower_budget(&self) -> Duration {
        self.poll_interval.saturating_mul(self.poll_attempts)
    }
}
