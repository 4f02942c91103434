//! Redis-backed shared store
//!
//! Set-if-absent maps to `SET key value NX PX ttl`. Compare-and-delete runs as a
//! server-side Lua script so the comparison and the delete cannot be separated by
//! another client's write.

use std::time::Duration;

use async_trait::async_trait;
use redis::Script;
use redis::aio::ConnectionManager;
use tracing::info;

use crate::store::SharedStore;

const COMPARE_AND_DELETE_SCRIPT: &str = r#"
if redis.call('get', KEYS[1]) == ARGV[1] then
    return redis.call('del', KEYS[1])
else
    return 0
end
"#;

/// Shared store backed by a Redis server
#[derive(Clone)]
pub struct RedisSharedStore {
    connection: ConnectionManager,
    release_script: Script,
}

impl RedisSharedStore {
    /// Connect to the Redis server at `url` (e.g. `redis://127.0.0.1:6379`)
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;

        info!("Connected to Redis shared store");

        Ok(Self {
            connection,
            release_script: Script::new(COMPARE_AND_DELETE_SCRIPT),
        })
    }
}

#[async_trait]
impl SharedStore for RedisSharedStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<bool> {
        let mut connection = self.connection.clone();
        // PX rejects zero
        let ttl_ms = (ttl.as_millis() as u64).max(1);

        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut connection)
            .await?;

        Ok(reply.is_some())
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> anyhow::Result<bool> {
        let mut connection = self.connection.clone();

        let deleted: i64 = self
            .release_script
            .key(key)
            .arg(expected)
            .invoke_async(&mut connection)
            .await?;

        Ok(deleted == 1)
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let mut connection = self.connection.clone();
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut connection)
            .await?;
        Ok(value)
    }

    async fn ping(&self) -> anyhow::Result<()> {
        let mut connection = self.connection.clone();
        let _: String = redis::cmd("PING").query_async(&mut connection).await?;
        Ok(())
    }
}
