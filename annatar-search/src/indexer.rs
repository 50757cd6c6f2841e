//! Trait definition for pluggable indexer clients.
//!
//! The coordinator talks to every backend through [`IndexerClient`], so
//! tests can substitute an in-memory client for [`HttpIndexerClient`].

use std::future::Future;
use std::time::Duration;

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::http;
use crate::indexers::{jackett, torznab};
use crate::types::{IndexerKind, IndexerSpec, Query, RawPayload};

/// A client able to run one query against one indexer.
///
/// Implementors handle URL construction, the network request and parsing
/// into [`RawPayload`] values. Timeouts are applied by
/// [`fetch_with_timeout`], not by implementors.
///
/// All implementations must be `Send + Sync` for concurrent fan-out.
pub trait IndexerClient: Send + Sync {
    /// Search `spec` for `query`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Unreachable`] on connection failures or
    /// non-success status codes and [`SearchError::MalformedResponse`] when
    /// the payload cannot be parsed.
    fn fetch(
        &self,
        query: &Query,
        spec: &IndexerSpec,
    ) -> impl Future<Output = Result<Vec<RawPayload>, SearchError>> + Send;
}

/// Run `client.fetch` with a deadline.
///
/// On expiry the in-flight request future is dropped, which cancels it,
/// and [`SearchError::Timeout`] is returned.
pub async fn fetch_with_timeout<C: IndexerClient>(
    client: &C,
    query: &Query,
    spec: &IndexerSpec,
    timeout: Duration,
) -> Result<Vec<RawPayload>, SearchError> {
    match tokio::time::timeout(timeout, client.fetch(query, spec)).await {
        Ok(result) => result,
        Err(_) => Err(SearchError::Timeout(format!(
            "{} did not answer within {}ms",
            spec.id,
            timeout.as_millis()
        ))),
    }
}

/// HTTP client for Jackett and Torznab indexers.
#[derive(Debug, Clone)]
pub struct HttpIndexerClient {
    client: reqwest::Client,
    jitter_ms: (u64, u64),
}

impl HttpIndexerClient {
    /// Build a client from the shared search configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if the HTTP client cannot be built.
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        Ok(Self {
            client: http::build_client(config)?,
            jitter_ms: config.request_jitter_ms,
        })
    }
}

impl IndexerClient for HttpIndexerClient {
    async fn fetch(&self, query: &Query, spec: &IndexerSpec) -> Result<Vec<RawPayload>, SearchError> {
        http::jitter(self.jitter_ms).await;

        match spec.kind {
            IndexerKind::Jackett => Ok(jackett::search(&self.client, spec, query)
                .await?
                .into_iter()
                .map(RawPayload::Jackett)
                .collect()),
            IndexerKind::Torznab => Ok(torznab::search(&self.client, spec, query)
                .await?
                .into_iter()
                .map(RawPayload::Torznab)
                .collect()),
        }
    }
}
