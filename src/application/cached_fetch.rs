use crate::application::cache::ResultCache;
use crate::application::single_flight::SingleFlight;
use crate::domain::error::ScrapeError;
use crate::domain::model::{FetchOrigin, Fetched, RequestKey};
use chrono::{Duration, Utc};
use serde_json::Value;
use std::future::Future;

/// Single-flight fetch with a time-boxed cache in front of the upstream.
///
/// Inside the coordinated section the cache is consulted first. A fresh
/// entry is returned as is; otherwise `upstream` runs and its result is
/// stored before being handed to every waiter. Failed fetches store
/// nothing.
#[derive(Clone)]
pub struct CachedFetcher {
    flight: SingleFlight<Fetched>,
    cache: ResultCache,
    freshness: Duration,
}

impl CachedFetcher {
    pub fn new(cache: ResultCache, freshness: Duration) -> Self {
        Self::with_flight(SingleFlight::new(), cache, freshness)
    }

    pub fn with_flight(flight: SingleFlight<Fetched>, cache: ResultCache, freshness: Duration) -> Self {
        Self {
            flight,
            cache,
            freshness,
        }
    }

    pub async fn fetch<F, Fut>(&self, key: &RequestKey, upstream: F) -> Result<Fetched, ScrapeError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Value, ScrapeError>> + Send + 'static,
    {
        let cache = self.cache.clone();
        let freshness = self.freshness;
        let key_owned = key.clone();

        self.flight
            .run(key, move || async move {
                let key = key_owned;
                match cache.get(&key).await {
                    Some(entry) if entry.is_fresh(freshness, Utc::now()) => {
                        tracing::debug!(key = %key, fetched_at = %entry.fetched_at, "cache hit");
                        return Ok(Fetched {
                            payload: entry.payload,
                            origin: FetchOrigin::Cache,
                            fetched_at: entry.fetched_at,
                        });
                    }
                    Some(entry) => {
                        tracing::debug!(key = %key, fetched_at = %entry.fetched_at, "cache entry stale")
                    }
                    None => tracing::debug!(key = %key, "cache miss"),
                }

                let payload = upstream().await?;
                let entry = cache.put(&key, payload).await;
                tracing::info!(key = %key, "stored fresh upstream result");

                Ok(Fetched {
                    payload: entry.payload,
                    origin: FetchOrigin::Upstream,
                    fetched_at: entry.fetched_at,
                })
            })
            .await
    }

    pub fn in_flight(&self) -> usize {
        self.flight.len()
    }

    pub fn freshness(&self) -> Duration {
        self.freshness
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::CacheEntry;
    use crate::domain::traits::CacheBackend;
    use crate::infrastructure::storage::cache::MemoryCacheStore;
    use async_trait::async_trait;
    use futures_util::future::join_all;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct BrokenBackend;

    #[async_trait]
    impl CacheBackend for BrokenBackend {
        async fn get(&self, _key: &RequestKey) -> Result<Option<CacheEntry>, ScrapeError> {
            Err(ScrapeError::Compression("corrupt frame".to_string()))
        }

        async fn put(&self, _key: &RequestKey, _entry: &CacheEntry) -> Result<(), ScrapeError> {
            Err(ScrapeError::Compression("disk full".to_string()))
        }

        fn name(&self) -> &'static str {
            "broken"
        }
    }

    fn fetcher(store: Arc<MemoryCacheStore>) -> CachedFetcher {
        CachedFetcher::new(ResultCache::new(store), Duration::hours(24))
    }

    fn counting_upstream(
        calls: &Arc<AtomicUsize>,
        payload: Value,
    ) -> impl FnOnce() -> futures_util::future::Ready<Result<Value, ScrapeError>> + Send + 'static
    {
        let calls = calls.clone();
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            futures_util::future::ready(Ok(payload))
        }
    }

    #[tokio::test]
    async fn test_second_call_is_served_from_cache() {
        let store = Arc::new(MemoryCacheStore::new());
        let fetcher = fetcher(store.clone());
        let calls = Arc::new(AtomicUsize::new(0));
        let key = RequestKey::derive("trustpilot_scrape_all", "https://example.com", None);

        let first = fetcher
            .fetch(&key, counting_upstream(&calls, json!({"reviews": [1, 2]})))
            .await
            .unwrap();
        assert_eq!(first.origin, FetchOrigin::Upstream);

        let second = fetcher
            .fetch(&key, counting_upstream(&calls, json!({"reviews": []})))
            .await
            .unwrap();
        assert!(second.from_cache());
        assert_eq!(second.payload, first.payload);
        assert_eq!(second.fetched_at, first.fetched_at);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_entry_is_refreshed() {
        let store = Arc::new(MemoryCacheStore::new());
        let key = RequestKey::derive("myhammer_scrape_all", "https://example.com", None);
        let old = CacheEntry {
            fetched_at: Utc::now() - Duration::hours(25),
            payload: json!({"reviews": ["old"]}),
        };
        store.put(&key, &old).await.unwrap();

        let fetcher = fetcher(store.clone());
        let calls = Arc::new(AtomicUsize::new(0));
        let fetched = fetcher
            .fetch(&key, counting_upstream(&calls, json!({"reviews": ["new"]})))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(fetched.origin, FetchOrigin::Upstream);
        assert_eq!(fetched.payload, json!({"reviews": ["new"]}));

        let stored = store.get(&key).await.unwrap().unwrap();
        assert!(stored.fetched_at > old.fetched_at);
        assert_eq!(stored.payload, json!({"reviews": ["new"]}));
    }

    #[tokio::test]
    async fn test_failed_fetch_writes_nothing() {
        let store = Arc::new(MemoryCacheStore::new());
        let fetcher = fetcher(store.clone());
        let key = RequestKey::derive("jameda_scrape_all", "https://example.com", Some(1));

        let result = fetcher
            .fetch(&key, || async {
                Err(ScrapeError::Upstream("dataset missing".to_string()))
            })
            .await;

        assert!(matches!(result, Err(ScrapeError::Upstream(_))));
        assert!(store.get(&key).await.unwrap().is_none());
        assert_eq!(fetcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_broken_backend_degrades_to_fetch() {
        let fetcher = CachedFetcher::new(ResultCache::new(Arc::new(BrokenBackend)), Duration::hours(24));
        let calls = Arc::new(AtomicUsize::new(0));
        let key = RequestKey::derive("anwalt_scrape_all", "https://example.com", None);

        for _ in 0..2 {
            let fetched = fetcher
                .fetch(&key, counting_upstream(&calls, json!([])))
                .await
                .unwrap();
            assert_eq!(fetched.origin, FetchOrigin::Upstream);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_misses_fetch_once() {
        let store = Arc::new(MemoryCacheStore::new());
        let fetcher = fetcher(store);
        let calls = Arc::new(AtomicUsize::new(0));
        let key = RequestKey::derive("booking_scrape_all", "https://example.com", Some(1));

        let fetches = (0..4).map(|_| {
            let calls = calls.clone();
            fetcher.fetch(&key, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(30)).await;
                Ok(json!({"reviews": ["shared"]}))
            })
        });

        for fetched in join_all(fetches).await {
            assert_eq!(fetched.unwrap().payload, json!({"reviews": ["shared"]}));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
