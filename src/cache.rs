//! In-memory TTL cache for assembled search responses.
//!
//! Caches the final [`SearchResponse`] keyed by the normalised request
//! parameters. Uses [`moka`] for async-friendly caching with TTL and
//! automatic eviction. Owned by the service state, so every query in the
//! engine itself stays stateless.

use std::sync::Arc;
use std::time::Duration;

use annatar_search::{Category, Query, SearchResponse};
use moka::future::Cache;

/// Maximum number of cached responses.
const MAX_CACHE_ENTRIES: u64 = 1_000;

/// Composite cache key: normalised terms plus every filter that changes
/// the result set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Lowercased, whitespace-collapsed search terms.
    terms: String,
    category: Option<Category>,
    season: Option<u32>,
    episode: Option<u32>,
    max_results: Option<usize>,
}

impl CacheKey {
    /// Build a deterministic key for `query`.
    ///
    /// Terms are lowercased and whitespace-collapsed so `"Ubuntu  22.04"`
    /// and `"ubuntu 22.04"` share an entry. The timeout budget is not part
    /// of the key.
    pub fn new(query: &Query) -> Self {
        Self {
            terms: query
                .terms
                .split_whitespace()
                .map(str::to_lowercase)
                .collect::<Vec<_>>()
                .join(" "),
            category: query.category,
            season: query.season,
            episode: query.episode,
            max_results: query.max_results,
        }
    }
}

/// Response cache. Cloning shares the underlying store.
#[derive(Clone)]
pub struct ResponseCache {
    inner: Option<Cache<CacheKey, Arc<SearchResponse>>>,
}

impl ResponseCache {
    /// A cache whose entries live for `ttl`. A zero TTL disables caching.
    pub fn new(ttl: Duration) -> Self {
        let inner = (!ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(MAX_CACHE_ENTRIES)
                .time_to_live(ttl)
                .build()
        });
        Self { inner }
    }

    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Look up a cached response. Returns `None` on miss or when disabled.
    pub async fn get(&self, key: &CacheKey) -> Option<Arc<SearchResponse>> {
        let cache = self.inner.as_ref()?;
        cache.get(key).await
    }

    /// Store a response. Partial responses are never cached, so a slow
    /// indexer gets another chance on the next request.
    pub async fn insert(&self, key: CacheKey, response: Arc<SearchResponse>) {
        let Some(cache) = self.inner.as_ref() else {
            return;
        };
        if response.partial {
            return;
        }
        cache.insert(key, response).await;
    }
}
