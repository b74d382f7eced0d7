//! Cache client contract and the in-memory implementation used in tests.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Backend(String),
    #[error("cache operation timed out")]
    Timeout,
}

impl CacheError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Thin contract over a volatile key-value backend.
///
/// Failure of the cache is not failure of the system: callers treat a failed
/// `get` as a miss and a failed `set_with_ttl`/invalidation as a logged
/// degradation. Single get/set/delete calls are atomic at the key level;
/// that key-level atomicity is the only concurrency primitive the layer
/// relies on.
#[async_trait]
pub trait CacheClient: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// The TTL is fixed at write time; expiry is delegated to the backend.
    async fn set_with_ttl(&self, key: &str, payload: &str, ttl_secs: u64)
    -> Result<(), CacheError>;

    /// Idempotent: deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Scan-then-delete over a key namespace, returning the number of keys
    /// removed. Keys created between scan and delete may survive one cycle;
    /// the TTL is the backstop.
    async fn delete_by_prefix(&self, prefix: &str) -> Result<u64, CacheError>;
}

struct Entry {
    payload: String,
    expires_at: Instant,
}

/// In-memory `CacheClient` with real TTL semantics, for tests and local
/// development without a Redis instance.
#[derive(Default)]
pub struct MemoryCacheClient {
    entries: Mutex<BTreeMap<String, Entry>>,
}

impl MemoryCacheClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of live (unexpired) entries; used by tests to inspect state.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.lock().values().filter(|e| e.expires_at > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Direct lookup without expiry bookkeeping, for test assertions.
    pub fn contains_key(&self, key: &str) -> bool {
        let now = Instant::now();
        self.lock().get(key).is_some_and(|e| e.expires_at > now)
    }
}

#[async_trait]
impl CacheClient for MemoryCacheClient {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.payload.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        payload: &str,
        ttl_secs: u64,
    ) -> Result<(), CacheError> {
        self.lock().insert(
            key.to_string(),
            Entry {
                payload: payload.to_string(),
                expires_at: Instant::now() + Duration::from_secs(ttl_secs),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.lock().remove(key);
        Ok(())
    }

    async fn delete_by_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        let mut entries = self.lock();
        let keys: Vec<String> = entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect();
        let count = keys.len() as u64;
        for key in keys {
            entries.remove(&key);
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let cache = MemoryCacheClient::new();
        cache.set_with_ttl("article:1", "{}", 10).await.expect("set");
        assert_eq!(cache.get("article:1").await.expect("get").as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn expired_entries_read_as_absent() {
        let cache = MemoryCacheClient::new();
        cache.set_with_ttl("article:1", "{}", 0).await.expect("set");
        assert!(cache.get("article:1").await.expect("get").is_none());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let cache = MemoryCacheClient::new();
        cache.delete("missing").await.expect("first delete");
        cache.delete("missing").await.expect("second delete");
    }

    #[tokio::test]
    async fn delete_by_prefix_only_touches_the_namespace() {
        let cache = MemoryCacheClient::new();
        cache.set_with_ttl("articles:a", "1", 10).await.expect("set");
        cache.set_with_ttl("articles:b", "2", 10).await.expect("set");
        cache.set_with_ttl("article:1", "3", 10).await.expect("set");
        cache.set_with_ttl("users:a", "4", 10).await.expect("set");

        let removed = cache.delete_by_prefix("articles:").await.expect("sweep");

        assert_eq!(removed, 2);
        assert!(cache.contains_key("article:1"));
        assert!(cache.contains_key("users:a"));
        assert!(!cache.contains_key("articles:a"));
        assert!(!cache.contains_key("articles:b"));
    }
}
