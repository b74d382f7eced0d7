//! Invalidation controller.
//!
//! Runs synchronously inside every mutation, after the store write has been
//! applied and before the mutation returns: callers never observe a state
//! where the mutation succeeded but stale entries are still guaranteed to be
//! served. A create can land on any page of any filter combination, so the
//! conservative move is to sweep the whole collection namespace for the
//! kind. Updates and deletes additionally drop the entity's own key.
//!
//! Invalidation is scoped per kind. There is no cascade across kinds:
//! author snapshots embedded in cached article entries may go briefly stale
//! after a user edit, bounded by the TTL.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, warn};

use super::client::CacheClient;
use super::keys::{EntityKind, collection_prefix, entity_key};

pub struct Invalidator {
    cache: Arc<dyn CacheClient>,
}

impl Invalidator {
    pub fn new(cache: Arc<dyn CacheClient>) -> Self {
        Self { cache }
    }

    pub async fn on_created(&self, kind: EntityKind) {
        self.sweep_collections(kind).await;
    }

    pub async fn on_updated(&self, kind: EntityKind, id: i64) {
        self.drop_entity(kind, id).await;
        self.sweep_collections(kind).await;
    }

    pub async fn on_deleted(&self, kind: EntityKind, id: i64) {
        self.drop_entity(kind, id).await;
        self.sweep_collections(kind).await;
    }

    async fn drop_entity(&self, kind: EntityKind, id: i64) {
        let key = entity_key(kind, id);
        match self.cache.delete(&key).await {
            Ok(()) => {
                counter!("byline_cache_invalidated_keys_total", "kind" => kind.as_str())
                    .increment(1);
                debug!(key, "entity cache entry invalidated");
            }
            // The mutation already succeeded; staleness past this point is
            // bounded by the TTL, so the failure is logged, not surfaced.
            Err(err) => {
                counter!("byline_cache_degraded_total", "op" => "delete").increment(1);
                warn!(key, error = %err, "entity cache invalidation failed");
            }
        }
    }

    async fn sweep_collections(&self, kind: EntityKind) {
        let prefix = collection_prefix(kind);
        match self.cache.delete_by_prefix(&prefix).await {
            Ok(count) => {
                counter!("byline_cache_invalidated_keys_total", "kind" => kind.as_str())
                    .increment(count);
                debug!(prefix, count, "collection namespace swept");
            }
            Err(err) => {
                counter!("byline_cache_degraded_total", "op" => "sweep").increment(1);
                warn!(prefix, error = %err, "collection sweep failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::cache::client::{CacheError, MemoryCacheClient};

    async fn seeded_cache() -> Arc<MemoryCacheClient> {
        let cache = Arc::new(MemoryCacheClient::new());
        for (key, payload) in [
            ("article:1", "a"),
            ("articles:page=1&limit=10", "b"),
            ("articles:page=2&limit=10", "c"),
            ("user:1", "d"),
            ("users:page=1&limit=10", "e"),
        ] {
            cache.set_with_ttl(key, payload, 60).await.expect("seed");
        }
        cache
    }

    #[tokio::test]
    async fn create_sweeps_only_the_kinds_collections() {
        let cache = seeded_cache().await;
        let invalidator = Invalidator::new(cache.clone());

        invalidator.on_created(EntityKind::Article).await;

        assert!(cache.contains_key("article:1"));
        assert!(!cache.contains_key("articles:page=1&limit=10"));
        assert!(!cache.contains_key("articles:page=2&limit=10"));
        assert!(cache.contains_key("user:1"));
        assert!(cache.contains_key("users:page=1&limit=10"));
    }

    #[tokio::test]
    async fn update_drops_the_entity_and_sweeps() {
        let cache = seeded_cache().await;
        let invalidator = Invalidator::new(cache.clone());

        invalidator.on_updated(EntityKind::Article, 1).await;

        assert!(!cache.contains_key("article:1"));
        assert!(!cache.contains_key("articles:page=1&limit=10"));
        assert!(cache.contains_key("user:1"));
    }

    struct UnreachableCache;

    #[async_trait]
    impl CacheClient for UnreachableCache {
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::backend("connection refused"))
        }

        async fn set_with_ttl(
            &self,
            _key: &str,
            _payload: &str,
            _ttl_secs: u64,
        ) -> Result<(), CacheError> {
            Err(CacheError::backend("connection refused"))
        }

        async fn delete(&self, _key: &str) -> Result<(), CacheError> {
            Err(CacheError::backend("connection refused"))
        }

        async fn delete_by_prefix(&self, _prefix: &str) -> Result<u64, CacheError> {
            Err(CacheError::backend("connection refused"))
        }
    }

    #[tokio::test]
    async fn backend_failures_are_swallowed() {
        let invalidator = Invalidator::new(Arc::new(UnreachableCache));

        // Every hook completes normally with the backend down; the mutation
        // they run inside must never observe the failure.
        invalidator.on_created(EntityKind::Article).await;
        invalidator.on_updated(EntityKind::Article, 1).await;
        invalidator.on_deleted(EntityKind::User, 2).await;
    }

    #[tokio::test]
    async fn delete_matches_update_semantics() {
        let cache = seeded_cache().await;
        let invalidator = Invalidator::new(cache.clone());

        invalidator.on_deleted(EntityKind::User, 1).await;

        assert!(!cache.contains_key("user:1"));
        assert!(!cache.contains_key("users:page=1&limit=10"));
        assert!(cache.contains_key("article:1"));
        assert!(cache.contains_key("articles:page=1&limit=10"));
    }
}
