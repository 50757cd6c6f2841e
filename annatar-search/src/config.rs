//! Aggregation configuration with sensible defaults.
//!
//! [`SearchConfig`] controls which indexers are queried, timeouts, result
//! caps, deduplication strictness and request behaviour. It is built once
//! at startup and injected read-only into the coordinator and the indexer
//! client.

use std::time::Duration;

use crate::error::SearchError;
use crate::types::{Category, IndexerSpec, Query};

/// Configuration for multi-indexer search.
///
/// Use [`Default::default()`] for sensible defaults, or construct with
/// field overrides for custom behaviour.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Indexers to fan out to. Disabled entries are kept but never queried.
    pub indexers: Vec<IndexerSpec>,
    /// Maximum number of results returned after deduplication and ranking.
    pub max_results: usize,
    /// Per-indexer timeout used when a spec carries no override.
    pub default_indexer_timeout: Duration,
    /// Query-level deadline covering the whole fan-out.
    pub global_timeout: Duration,
    /// Maximum number of indexer requests in flight for one query.
    pub max_concurrency: usize,
    /// Minimum token Jaccard similarity for two titles to be treated as the
    /// same release. Range `(0, 1]`.
    pub similarity_threshold: f64,
    /// Cap each resolution at `ceil(max_results / 2)` entries so one quality
    /// tier cannot crowd out the rest.
    pub diversify_resolutions: bool,
    /// Random delay range in milliseconds `(min, max)` before each indexer
    /// request.
    pub request_jitter_ms: (u64, u64),
    /// Custom User-Agent string. Defaults to `annatar/<version>`.
    pub user_agent: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            indexers: Vec::new(),
            max_results: 20,
            default_indexer_timeout: Duration::from_secs(6),
            global_timeout: Duration::from_secs(10),
            max_concurrency: 8,
            similarity_threshold: 0.8,
            diversify_resolutions: true,
            request_jitter_ms: (0, 100),
            user_agent: None,
        }
    }
}

impl SearchConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `max_results` and `max_concurrency` must be greater than 0
    /// - timeouts must be greater than 0
    /// - at least one indexer must be enabled, and indexer ids must be unique
    /// - `similarity_threshold` must lie in `(0, 1]`
    /// - `request_jitter_ms.0` must be <= `request_jitter_ms.1`
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.max_results == 0 {
            return Err(SearchError::Config(
                "max_results must be greater than 0".into(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(SearchError::Config(
                "max_concurrency must be greater than 0".into(),
            ));
        }
        if self.default_indexer_timeout.is_zero() || self.global_timeout.is_zero() {
            return Err(SearchError::Config(
                "timeouts must be greater than 0".into(),
            ));
        }
        if !self.indexers.iter().any(|i| i.enabled) {
            return Err(SearchError::Config(
                "at least one indexer must be enabled".into(),
            ));
        }
        for (idx, spec) in self.indexers.iter().enumerate() {
            if spec.id.trim().is_empty() {
                return Err(SearchError::Config("indexer id must not be empty".into()));
            }
            if self.indexers[..idx].iter().any(|other| other.id == spec.id) {
                return Err(SearchError::Config(format!(
                    "duplicate indexer id `{}`",
                    spec.id
                )));
            }
            if spec.timeout.is_some_and(|t| t.is_zero()) {
                return Err(SearchError::Config(format!(
                    "indexer `{}` timeout must be greater than 0",
                    spec.id
                )));
            }
            if !(spec.trust.is_finite() && spec.trust > 0.0) {
                return Err(SearchError::Config(format!(
                    "indexer `{}` trust must be a positive number",
                    spec.id
                )));
            }
        }
        if !(self.similarity_threshold > 0.0 && self.similarity_threshold <= 1.0) {
            return Err(SearchError::Config(
                "similarity_threshold must be in (0, 1]".into(),
            ));
        }
        if self.request_jitter_ms.0 > self.request_jitter_ms.1 {
            return Err(SearchError::Config(
                "request_jitter_ms min must be <= max".into(),
            ));
        }
        Ok(())
    }

    /// Enabled indexers able to answer queries in `category`.
    pub fn eligible_indexers(&self, category: Option<Category>) -> Vec<&IndexerSpec> {
        self.indexers
            .iter()
            .filter(|spec| spec.enabled && spec.supports(category))
            .collect()
    }

    /// Timeout applied to a single indexer request.
    pub fn indexer_timeout(&self, spec: &IndexerSpec) -> Duration {
        spec.timeout.unwrap_or(self.default_indexer_timeout)
    }

    /// Result cap for `query`: the smaller of the query's and the configured cap.
    pub fn effective_max_results(&self, query: &Query) -> usize {
        query
            .max_results
            .map_or(self.max_results, |m| m.min(self.max_results))
    }

    /// Deadline budget for `query`: the smaller of the query's and the global one.
    pub fn effective_timeout(&self, query: &Query) -> Duration {
        query
            .timeout
            .map_or(self.global_timeout, |t| t.min(self.global_timeout))
    }
}
