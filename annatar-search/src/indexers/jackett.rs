//! Jackett JSON results API.
//!
//! Each configured Jackett indexer is queried through
//! `GET {endpoint}/api/v2.0/indexers/{id}/results`, which returns a JSON
//! document with a `Results` array.

use serde::Deserialize;
use url::Url;

use crate::error::SearchError;
use crate::http;
use crate::types::{IndexerSpec, Query};

/// One entry of Jackett's `Results` array. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JackettItem {
    pub title: String,
    pub size: Option<u64>,
    pub seeders: Option<u32>,
    pub peers: Option<u32>,
    pub publish_date: Option<String>,
    pub info_hash: Option<String>,
    pub magnet_uri: Option<String>,
    pub link: Option<String>,
    pub tracker: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JackettResponse {
    #[serde(rename = "Results")]
    results: Vec<JackettItem>,
}

/// Build the results URL for `spec` and `query`.
pub(crate) fn request_url(spec: &IndexerSpec, query: &Query) -> Result<Url, SearchError> {
    let mut url = Url::parse(&spec.endpoint).map_err(|e| {
        SearchError::Config(format!("indexer `{}` has invalid endpoint: {e}", spec.id))
    })?;

    url.path_segments_mut()
        .map_err(|()| {
            SearchError::Config(format!("indexer `{}` endpoint cannot be a base", spec.id))
        })?
        .pop_if_empty()
        .extend(["api", "v2.0", "indexers", spec.id.as_str(), "results"]);

    {
        let mut pairs = url.query_pairs_mut();
        if let Some(key) = &spec.api_key {
            pairs.append_pair("apikey", key);
        }
        pairs.append_pair("Query", &query.expanded_terms());
        if let Some(category) = query.category {
            pairs.append_pair("Category[]", &category.newznab_code().to_string());
        }
    }

    Ok(url)
}

/// Query one Jackett indexer and parse its results.
pub(crate) async fn search(
    client: &reqwest::Client,
    spec: &IndexerSpec,
    query: &Query,
) -> Result<Vec<JackettItem>, SearchError> {
    let url = request_url(spec, query)?;
    tracing::trace!(indexer = %spec.id, terms = %query.terms, "Jackett search");

    let body = client
        .get(url)
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|e| http::classify_error(&spec.id, e))?
        .error_for_status()
        .map_err(|e| http::classify_error(&spec.id, e))?
        .text()
        .await
        .map_err(|e| http::classify_error(&spec.id, e))?;

    tracing::trace!(indexer = %spec.id, bytes = body.len(), "Jackett response received");

    parse_jackett_json(&spec.id, &body)
}

/// Parse a Jackett results document.
///
/// Extracted as a separate function for testability with fixture JSON.
pub(crate) fn parse_jackett_json(indexer: &str, body: &str) -> Result<Vec<JackettItem>, SearchError> {
    let response: JackettResponse = serde_json::from_str(body)
        .map_err(|e| SearchError::MalformedResponse(format!("{indexer}: {e}")))?;

    let items: Vec<JackettItem> = response
        .results
        .into_iter()
        .filter(|item| !item.title.trim().is_empty())
        .collect();

    tracing::debug!(indexer, count = items.len(), "Jackett results parsed");
    Ok(items)
}
