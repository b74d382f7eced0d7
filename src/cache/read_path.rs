//! Cache-aside read path.
//!
//! Both operations follow the same pattern: derive a key, try the cache, on
//! miss load from the store and write the response-shaped payload back with
//! a TTL. Cache failures of any sort degrade to the store path; store
//! failures propagate. Negative results are never cached, so a transient
//! "not yet created" state cannot linger for a TTL.
//!
//! Concurrent misses on the same key may each load and each write back; the
//! loads are idempotent and last-write-wins on the entry, bounded by the
//! short TTL. No single-flight coalescing is attempted.

use std::future::Future;

use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use crate::application::repos::RepoError;

use super::client::CacheClient;
use super::keys::{CollectionQuery, EntityKind, collection_key, entity_key};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("entity not found")]
    NotFound,
    #[error(transparent)]
    Store(#[from] RepoError),
}

/// Read-through lookup of a single entity.
///
/// The loader's `None` maps to [`FetchError::NotFound`] and performs no
/// cache write.
pub async fn fetch_entity<T, L, Fut>(
    cache: &dyn CacheClient,
    ttl_secs: u64,
    kind: EntityKind,
    id: i64,
    loader: L,
) -> Result<T, FetchError>
where
    T: Serialize + DeserializeOwned,
    L: FnOnce() -> Fut,
    Fut: Future<Output = Result<Option<T>, RepoError>>,
{
    let key = entity_key(kind, id);
    if let Some(value) = lookup(cache, kind, &key).await {
        return Ok(value);
    }

    let value = loader().await?.ok_or(FetchError::NotFound)?;
    populate(cache, kind, &key, &value, ttl_secs).await;
    Ok(value)
}

/// Read-through lookup of one collection page.
///
/// The whole page structure is the unit of caching. Collections always
/// exist: an empty result is a valid, cacheable page, not an absence.
pub async fn fetch_collection<T, Q, L, Fut>(
    cache: &dyn CacheClient,
    ttl_secs: u64,
    kind: EntityKind,
    query: &Q,
    loader: L,
) -> Result<T, FetchError>
where
    T: Serialize + DeserializeOwned,
    Q: CollectionQuery,
    L: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, RepoError>>,
{
    let key = collection_key(kind, query);
    if let Some(value) = lookup(cache, kind, &key).await {
        return Ok(value);
    }

    let value = loader().await?;
    populate(cache, kind, &key, &value, ttl_secs).await;
    Ok(value)
}

/// Cache lookup: a hit must deserialize; an undecodable payload is a miss.
/// A backend failure is a degradation, not a miss, so it never skews the
/// hit-rate counters.
async fn lookup<T: DeserializeOwned>(
    cache: &dyn CacheClient,
    kind: EntityKind,
    key: &str,
) -> Option<T> {
    let payload = match cache.get(key).await {
        Ok(payload) => payload,
        Err(err) => {
            counter!("byline_cache_degraded_total", "op" => "get").increment(1);
            warn!(key, error = %err, "cache get failed, degrading to store");
            return None;
        }
    };

    let Some(payload) = payload else {
        counter!("byline_cache_miss_total", "kind" => kind.as_str()).increment(1);
        return None;
    };

    match serde_json::from_str(&payload) {
        Ok(value) => {
            counter!("byline_cache_hit_total", "kind" => kind.as_str()).increment(1);
            Some(value)
        }
        Err(err) => {
            // A payload we cannot decode is treated as a miss and will be
            // overwritten by the fresh write-back.
            counter!("byline_cache_miss_total", "kind" => kind.as_str()).increment(1);
            debug!(key, error = %err, "cached payload failed to deserialize");
            None
        }
    }
}

/// Write-back after a successful load. Awaited so population precedes the
/// next request, but a failure is logged rather than surfaced.
async fn populate<T: Serialize>(
    cache: &dyn CacheClient,
    kind: EntityKind,
    key: &str,
    value: &T,
    ttl_secs: u64,
) {
    let payload = match serde_json::to_string(value) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(key, error = %err, "failed to serialize cache payload");
            return;
        }
    };

    if let Err(err) = cache.set_with_ttl(key, &payload, ttl_secs).await {
        counter!("byline_cache_degraded_total", "op" => "set").increment(1);
        warn!(key, error = %err, "cache population failed");
    } else {
        debug!(key, kind = kind.as_str(), ttl_secs, "cache entry populated");
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use metrics::{SharedString, Unit};
    use metrics_util::CompositeKey;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};
    use serde::Deserialize;

    use super::*;
    use crate::cache::client::{CacheError, MemoryCacheClient};

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

    fn counter_value(
        metrics: &[(CompositeKey, Option<Unit>, Option<SharedString>, DebugValue)],
        name: &str,
        label: (&str, &str),
    ) -> Option<u64> {
        metrics.iter().find_map(|(key, _, _, value)| {
            let key = key.key();
            let labeled = key
                .labels()
                .any(|l| l.key() == label.0 && l.value() == label.1);
            match value {
                DebugValue::Counter(v) if key.name() == name && labeled => Some(*v),
                _ => None,
            }
        })
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Snapshot {
        id: i64,
        title: String,
    }

    fn snapshot(id: i64) -> Snapshot {
        Snapshot {
            id,
            title: format!("article {id}"),
        }
    }

    #[tokio::test]
    async fn miss_loads_and_populates() {
        let cache = MemoryCacheClient::new();

        let value = fetch_entity(&cache, 10, EntityKind::Article, 1, || async {
            Ok(Some(snapshot(1)))
        })
        .await
        .expect("fetch");

        assert_eq!(value, snapshot(1));
        assert!(cache.contains_key("article:1"));
    }

    #[tokio::test]
    async fn hit_skips_the_loader() {
        let cache = MemoryCacheClient::new();
        cache
            .set_with_ttl(
                "article:1",
                &serde_json::to_string(&snapshot(1)).expect("payload"),
                10,
            )
            .await
            .expect("seed");

        let value: Snapshot = fetch_entity(&cache, 10, EntityKind::Article, 1, || async {
            panic!("loader must not run on a hit")
        })
        .await
        .expect("fetch");

        assert_eq!(value, snapshot(1));
    }

    #[tokio::test]
    async fn absent_entity_is_not_cached() {
        let cache = MemoryCacheClient::new();

        let result: Result<Snapshot, _> =
            fetch_entity(&cache, 10, EntityKind::Article, 9, || async { Ok(None) }).await;

        assert!(matches!(result, Err(FetchError::NotFound)));
        assert!(!cache.contains_key("article:9"));
    }

    #[tokio::test]
    async fn corrupt_payload_is_a_miss() {
        let cache = MemoryCacheClient::new();
        cache
            .set_with_ttl("article:1", "not json", 10)
            .await
            .expect("seed");

        let value = fetch_entity(&cache, 10, EntityKind::Article, 1, || async {
            Ok(Some(snapshot(1)))
        })
        .await
        .expect("fetch");

        assert_eq!(value, snapshot(1));
        // The fresh write-back replaced the corrupt entry.
        let stored = cache.get("article:1").await.expect("get").expect("entry");
        assert_eq!(
            serde_json::from_str::<Snapshot>(&stored).expect("decodes"),
            snapshot(1)
        );
    }

    #[tokio::test]
    async fn backend_failure_degrades_to_the_store() {
        let value = fetch_entity(&UnreachableCache, 10, EntityKind::Article, 1, || async {
            Ok(Some(snapshot(1)))
        })
        .await
        .expect("fetch degrades to the store");

        assert_eq!(value, snapshot(1));
    }

    #[tokio::test]
    async fn backend_failure_degrades_for_collections_too() {
        let page = fetch_collection(
            &UnreachableCache,
            10,
            EntityKind::Article,
            &crate::application::repos::ArticleQuery::default(),
            || async { Ok(vec![snapshot(1), snapshot(2)]) },
        )
        .await
        .expect("fetch degrades to the store");

        assert_eq!(page, vec![snapshot(1), snapshot(2)]);
    }

    #[test]
    fn degraded_get_is_not_counted_as_a_miss() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime");

        metrics::with_local_recorder(&recorder, || {
            runtime.block_on(async {
                let value =
                    fetch_entity(&UnreachableCache, 10, EntityKind::Article, 1, || async {
                        Ok(Some(snapshot(1)))
                    })
                    .await
                    .expect("fetch degrades to the store");
                assert_eq!(value, snapshot(1));
            })
        });

        let metrics = snapshotter.snapshot().into_vec();
        assert_eq!(
            counter_value(&metrics, "byline_cache_degraded_total", ("op", "get")),
            Some(1)
        );
        assert_eq!(
            counter_value(&metrics, "byline_cache_miss_total", ("kind", "article")),
            None,
            "a backend failure must not count as a miss"
        );
    }

    #[test]
    fn true_miss_still_counts_as_a_miss() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime");

        metrics::with_local_recorder(&recorder, || {
            runtime.block_on(async {
                let cache = MemoryCacheClient::new();
                let value = fetch_entity(&cache, 10, EntityKind::Article, 1, || async {
                    Ok(Some(snapshot(1)))
                })
                .await
                .expect("fetch");
                assert_eq!(value, snapshot(1));
            })
        });

        let metrics = snapshotter.snapshot().into_vec();
        assert_eq!(
            counter_value(&metrics, "byline_cache_miss_total", ("kind", "article")),
            Some(1)
        );
        assert_eq!(
            counter_value(&metrics, "byline_cache_degraded_total", ("op", "get")),
            None
        );
    }

    #[tokio::test]
    async fn store_errors_propagate() {
        let cache = MemoryCacheClient::new();

        let result: Result<Snapshot, _> =
            fetch_entity(&cache, 10, EntityKind::Article, 1, || async {
                Err(RepoError::Timeout)
            })
            .await;

        assert!(matches!(result, Err(FetchError::Store(RepoError::Timeout))));
    }
}
