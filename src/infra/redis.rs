//! Redis-backed cache client.
//!
//! Every call is bounded by a per-operation timeout so a slow or partitioned
//! cache can never hold a request hostage; the read path treats any error
//! here as a miss. `delete_by_prefix` is SCAN MATCH plus DEL rather than
//! KEYS, so the sweep never blocks the Redis event loop on large keyspaces.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, RedisResult};
use tokio::time::timeout;

use crate::cache::{CacheClient, CacheError};

use super::error::InfraError;

pub struct RedisCacheClient {
    connection: MultiplexedConnection,
    op_timeout: Duration,
}

impl RedisCacheClient {
    pub async fn connect(url: &str, op_timeout_ms: u64) -> Result<Self, InfraError> {
        let client = redis::Client::open(url)
            .map_err(|err| InfraError::cache_backend(format!("invalid redis url: {err}")))?;
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|err| InfraError::cache_backend(format!("redis connect failed: {err}")))?;
        Ok(Self {
            connection,
            op_timeout: Duration::from_millis(op_timeout_ms),
        })
    }

    async fn bounded<T>(
        &self,
        fut: impl Future<Output = RedisResult<T>>,
    ) -> Result<T, CacheError> {
        match timeout(self.op_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(CacheError::backend(err)),
            Err(_) => Err(CacheError::Timeout),
        }
    }
}

#[async_trait]
impl CacheClient for RedisCacheClient {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection.clone();
        self.bounded(async move { conn.get(key).await }).await
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        payload: &str,
        ttl_secs: u64,
    ) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        self.bounded(async move { conn.set_ex(key, payload, ttl_secs).await })
            .await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        self.bounded(async move { conn.del(key).await }).await
    }

    async fn delete_by_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        let pattern = format!("{prefix}*");
        let mut scan_conn = self.connection.clone();
        let mut del_conn = self.connection.clone();

        self.bounded(async move {
            let mut keys = Vec::new();
            {
                let mut iter = scan_conn.scan_match::<_, String>(&pattern).await?;
                while let Some(key) = iter.next_item().await {
                    keys.push(key);
                }
            }

            if keys.is_empty() {
                return Ok(0);
            }

            let count = keys.len() as u64;
            let () = del_conn.del(keys).await?;
            Ok(count)
        })
        .await
    }
}
