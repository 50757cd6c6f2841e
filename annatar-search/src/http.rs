//! Shared HTTP client and error mapping for indexer requests.
//!
//! Provides a configured [`reqwest::Client`] and the translation from
//! transport errors to the [`SearchError`] taxonomy.

use std::time::Duration;

use rand::Rng;

use crate::config::SearchConfig;
use crate::error::SearchError;

/// Build a [`reqwest::Client`] configured for indexer requests.
///
/// The client has:
/// - A connect timeout bounded by the default per-indexer timeout
/// - `annatar/<version>` User-Agent (or the configured override)
/// - Brotli and gzip decompression
///
/// The overall request deadline is not set here; the indexer client wraps
/// each call in its own timeout so the in-flight future can be cancelled.
///
/// # Errors
///
/// Returns [`SearchError::Config`] if the client cannot be constructed.
pub fn build_client(config: &SearchConfig) -> Result<reqwest::Client, SearchError> {
    let ua = match config.user_agent {
        Some(ref custom) => custom.clone(),
        None => default_user_agent(),
    };

    reqwest::Client::builder()
        .connect_timeout(config.default_indexer_timeout)
        .user_agent(ua)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| SearchError::Config(format!("failed to build HTTP client: {e}")))
}

pub fn default_user_agent() -> String {
    format!("annatar/{}", env!("CARGO_PKG_VERSION"))
}

/// Map a transport error from `indexer` onto the search error taxonomy.
///
/// The request URL is stripped from the message since it carries the
/// API key as a query parameter.
pub fn classify_error(indexer: &str, err: reqwest::Error) -> SearchError {
    let err = err.without_url();
    if err.is_timeout() {
        SearchError::Timeout(format!("{indexer}: {err}"))
    } else if err.is_decode() || err.is_body() {
        SearchError::MalformedResponse(format!("{indexer}: {err}"))
    } else if let Some(status) = err.status() {
        SearchError::Unreachable(format!("{indexer}: HTTP {status}"))
    } else {
        SearchError::Unreachable(format!("{indexer}: {err}"))
    }
}

/// Sleep for a random duration inside `range` milliseconds.
///
/// Spreads bursts of concurrent requests against a shared backend.
pub async fn jitter(range: (u64, u64)) {
    let (min, max) = range;
    if max == 0 {
        return;
    }
    let millis = if min >= max {
        min
    } else {
        rand::thread_rng().gen_range(min..=max)
    };
    tokio::time::sleep(Duration::from_millis(millis)).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_user_agent_names_crate_version() {
        let ua = default_user_agent();
        assert!(ua.starts_with("annatar/"));
        assert!(ua.len() > "annatar/".len());
    }

    #[test]
    fn build_client_with_default_config() {
        assert!(build_client(&SearchConfig::default()).is_ok());
    }

    #[test]
    fn build_client_with_custom_ua() {
        let config = SearchConfig {
            user_agent: Some("CustomBot/1.0".into()),
            ..Default::default()
        };
        assert!(build_client(&config).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn jitter_waits_within_range() {
        let start = tokio::time::Instant::now();
        jitter((20, 40)).await;
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(20));
        assert!(waited <= Duration::from_millis(41));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_jitter_returns_immediately() {
        let start = tokio::time::Instant::now();
        jitter((0, 0)).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
