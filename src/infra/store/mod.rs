//! Key-value store adapters.

mod memory;
mod redis_store;

use std::sync::Arc;

use tracing::warn;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

use crate::application::store::{KeyValueStore, StoreError};
use crate::config::StoreSettings;

/// Open the configured store. Without a url, fall back to a process-local store.
pub async fn connect(settings: &StoreSettings) -> Result<Arc<dyn KeyValueStore>, StoreError> {
    match settings.url.as_deref() {
        Some(url) => Ok(Arc::new(RedisStore::connect(url).await?)),
        None => {
            warn!(
                target: "unsolved::store",
                backend = "memory",
                "No store url configured; generation locks only coordinate this process"
            );
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
