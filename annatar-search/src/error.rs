//! Error types for the annatar-search crate.
//!
//! All errors use stable string messages suitable for display to users
//! and programmatic handling. Indexer API keys never appear in error
//! messages.

/// Errors that can occur while querying indexers or aggregating results.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// An indexer (or the whole query) exceeded its time budget.
    #[error("timed out: {0}")]
    Timeout(String),

    /// A connection-level failure or a non-success HTTP status.
    #[error("indexer unreachable: {0}")]
    Unreachable(String),

    /// The indexer answered but its payload could not be parsed.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Every indexer failed or returned nothing.
    #[error("no results available: {0}")]
    NoResultsAvailable(String),

    /// Invalid search configuration or query.
    #[error("config error: {0}")]
    Config(String),
}

impl SearchError {
    /// Short machine-readable label, used in logs and response payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "timeout",
            Self::Unreachable(_) => "unreachable",
            Self::MalformedResponse(_) => "malformed_response",
            Self::NoResultsAvailable(_) => "no_results_available",
            Self::Config(_) => "config",
        }
    }
}

/// Convenience type alias for annatar-search results.
pub type Result<T> = std::result::Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_timeout() {
        let err = SearchError::Timeout("yts exceeded 6s".into());
        assert_eq!(err.to_string(), "timed out: yts exceeded 6s");
    }

    #[test]
    fn display_unreachable() {
        let err = SearchError::Unreachable("connection refused".into());
        assert_eq!(err.to_string(), "indexer unreachable: connection refused");
    }

    #[test]
    fn display_malformed_response() {
        let err = SearchError::MalformedResponse("expected `Results` array".into());
        assert_eq!(
            err.to_string(),
            "malformed response: expected `Results` array"
        );
    }

    #[test]
    fn display_no_results() {
        let err = SearchError::NoResultsAvailable("3 indexers failed".into());
        assert_eq!(err.to_string(), "no results available: 3 indexers failed");
    }

    #[test]
    fn display_config() {
        let err = SearchError::Config("max_results must be > 0".into());
        assert_eq!(err.to_string(), "config error: max_results must be > 0");
    }

    #[test]
    fn kind_labels_are_stable() {
        assert_eq!(SearchError::Timeout(String::new()).kind(), "timeout");
        assert_eq!(SearchError::Unreachable(String::new()).kind(), "unreachable");
        assert_eq!(
            SearchError::MalformedResponse(String::new()).kind(),
            "malformed_response"
        );
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SearchError>();
    }
}
