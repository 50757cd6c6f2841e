//! # annatar-search
//!
//! Concurrent multi-indexer torrent search aggregation for Annatar.
//!
//! One query is fanned out to every configured Jackett or Torznab indexer,
//! the heterogeneous answers are mapped onto a single record shape, copies
//! of the same release are merged, and the survivors are ranked and cut to
//! a maximum count.
//!
//! ## Design
//!
//! - Queries indexers concurrently, bounded by `max_concurrency`
//! - Per-indexer timeouts plus a global query deadline; slow indexers are
//!   cancelled and reported, never awaited
//! - Graceful degradation: partial results are returned as long as one
//!   indexer answered
//! - Deterministic ranking: the same responses always produce the same
//!   order
//! - No state shared between queries; caching lives in the caller
//!
//! ## Security
//!
//! - Indexer API keys are redacted from `Debug` output, serialisation and
//!   error messages
//! - Search terms are logged only at trace level

pub mod config;
pub mod error;
pub mod http;
pub mod indexer;
pub mod indexers;
pub mod orchestrator;
pub mod response;
pub mod types;

use std::sync::Arc;

use chrono::{DateTime, Utc};

pub use config::SearchConfig;
pub use error::{Result, SearchError};
pub use indexer::{HttpIndexerClient, IndexerClient};
pub use response::{assemble, SearchResponse};
pub use types::{Category, IndexerKind, IndexerSpec, Query, ResultSet};

/// Entry point: a validated configuration paired with an indexer client.
///
/// Cheap to clone when `C` is; every query reads the configuration
/// without mutating it.
#[derive(Debug, Clone)]
pub struct Aggregator<C = HttpIndexerClient> {
    config: Arc<SearchConfig>,
    client: C,
}

impl Aggregator<HttpIndexerClient> {
    /// Build an aggregator that talks HTTP to the configured indexers.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if the configuration is invalid or
    /// the HTTP client cannot be built.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # async fn example() -> annatar_search::Result<()> {
    /// use annatar_search::{Aggregator, IndexerSpec, Query, SearchConfig};
    ///
    /// let config = SearchConfig {
    ///     indexers: vec![IndexerSpec::jackett("yts", "http://localhost:9117").with_api_key("key")],
    ///     ..Default::default()
    /// };
    /// let aggregator = Aggregator::new(config)?;
    /// let results = aggregator.search(&Query::new("ubuntu 22.04")).await?;
    /// for ranked in &results.records {
    ///     println!("{:.3} {}", ranked.score, ranked.record.title);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(config: SearchConfig) -> Result<Self> {
        config.validate()?;
        let client = HttpIndexerClient::new(&config)?;
        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }
}

impl<C: IndexerClient> Aggregator<C> {
    /// Build an aggregator around a custom client.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if the configuration is invalid.
    pub fn with_client(config: SearchConfig, client: C) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Run `query` against every eligible indexer, ranking by recency
    /// relative to the current time.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] for an invalid query and
    /// [`SearchError::NoResultsAvailable`] when no indexer produced a
    /// result. Individual indexer failures are reported in
    /// [`ResultSet::failures`] instead.
    pub async fn search(&self, query: &Query) -> Result<ResultSet> {
        self.search_at(query, Utc::now()).await
    }

    /// Like [`Aggregator::search`] with an explicit reference instant.
    ///
    /// # Errors
    ///
    /// Same as [`Aggregator::search`].
    pub async fn search_at(&self, query: &Query, now: DateTime<Utc>) -> Result<ResultSet> {
        tracing::trace!(terms = %query.terms, "search requested");
        orchestrator::orchestrate_search(&self.client, &self.config, query, now).await
    }
}
