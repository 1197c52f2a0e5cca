//! Key-value store contract shared by every server instance.
//!
//! The article lock protocol depends on [`KeyValueStore::set`] performing the
//! existence check and the write as one atomic step when
//! [`SetOptions::if_absent`] is requested together with an expiry.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key-value store unavailable: {0}")]
    Unavailable(String),
    #[error("key-value store command failed: {0}")]
    Backend(String),
    #[error("value could not be serialized for the key-value store: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        Self::Unavailable(err.to_string())
    }

    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }

    pub fn serialization(err: impl std::fmt::Display) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Time to live; `None` keeps the value until deleted.
    pub expiry: Option<Duration>,
    /// Only write when the key does not currently exist.
    pub if_absent: bool,
}

impl SetOptions {
    pub fn permanent() -> Self {
        Self::default()
    }

    pub fn expiring(ttl: Duration) -> Self {
        Self {
            expiry: Some(ttl),
            if_absent: false,
        }
    }

    /// Create-if-absent with expiry, the primitive used for generation locks.
    pub fn exclusive(ttl: Duration) -> Self {
        Self {
            expiry: Some(ttl),
            if_absent: true,
        }
    }
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Returns `false` only when `if_absent` was requested and the key already existed.
    async fn set(&self, key: &str, value: &str, options: SetOptions) -> Result<bool, StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Delete `key` only while it still holds `expected`, as one atomic step.
    /// Returns whether the key was deleted.
    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, StoreError>;

    /// Round-trip check used by the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;
}
