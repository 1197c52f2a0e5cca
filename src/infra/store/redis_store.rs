//! Redis-backed key-value store shared by every server instance.

use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client, Cmd, RedisError, Script, aio::ConnectionManager};
use tracing::info;

use crate::application::store::{KeyValueStore, SetOptions, StoreError};

#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    /// Connect and keep a multiplexed, auto-reconnecting connection.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = Client::open(url).map_err(StoreError::unavailable)?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(StoreError::unavailable)?;
        info!(target: "unsolved::store", backend = "redis", "Key-value store connected");
        Ok(Self { connection })
    }
}

fn map_error(err: RedisError) -> StoreError {
    if err.is_io_error() || err.is_connection_refusal() || err.is_timeout() {
        StoreError::unavailable(err)
    } else {
        StoreError::backend(err)
    }
}

/// `SET key value [NX] [EX s | PX ms]` as one command, so create-if-absent
/// with expiry is atomic on the server.
fn set_command(key: &str, value: &str, options: SetOptions) -> Cmd {
    let mut cmd = redis::cmd("SET");
    cmd.arg(key).arg(value);
    if options.if_absent {
        cmd.arg("NX");
    }
    match options.expiry {
        Some(ttl) if ttl.subsec_millis() == 0 => {
            cmd.arg("EX").arg(ttl.as_secs().max(1));
        }
        Some(ttl) => {
            cmd.arg("PX").arg(millis(ttl));
        }
        None => {}
    }
    cmd
}

/// Compare-and-delete evaluated server side.
const DELETE_IF_EQUALS: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
end
return 0
"#;

fn millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut connection = self.connection.clone();
        connection.get(key).await.map_err(map_error)
    }

    async fn set(&self, key: &str, value: &str, options: SetOptions) -> Result<bool, StoreError> {
        let mut connection = self.connection.clone();
        // Nil reply means NX refused the write.
        let reply: Option<String> = set_command(key, value, options)
            .query_async(&mut connection)
            .await
            .map_err(map_error)?;
        Ok(reply.is_some())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();
        let _: i64 = connection.del(key).await.map_err(map_error)?;
        Ok(())
    }

    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, StoreError> {
        let mut connection = self.connection.clone();
        let deleted: i64 = Script::new(DELETE_IF_EQUALS)
            .key(key)
            .arg(expected)
            .invoke_async(&mut connection)
            .await
            .map_err(map_error)?;
        Ok(deleted == 1)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut connection)
            .await
            .map_err(map_error)?;
        Ok(())
    }
}
