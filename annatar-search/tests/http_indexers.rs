//! HTTP indexer client tests against a local mock server.
//!
//! Each test stands up a [`MockServer`] speaking either the Jackett JSON
//! API or the Torznab XML API and checks request shape and error mapping.

use std::time::Duration;

use annatar_search::{Aggregator, HttpIndexerClient, IndexerClient, IndexerSpec, Query, SearchConfig, SearchError};
use annatar_search::types::RawPayload;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JACKETT_JSON: &str = include_str!("../test-data/jackett.json");
const TORZNAB_XML: &str = include_str!("../test-data/torznab.xml");

fn config(indexers: Vec<IndexerSpec>) -> SearchConfig {
    SearchConfig {
        indexers,
        request_jitter_ms: (0, 0),
        ..Default::default()
    }
}

#[tokio::test]
async fn jackett_request_and_parse() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2.0/indexers/yts/results"))
        .and(query_param("apikey", "abc"))
        .and(query_param("Query", "ubuntu 22.04"))
        .respond_with(ResponseTemplate::new(200).set_body_string(JACKETT_JSON))
        .expect(1)
        .mount(&server)
        .await;

    let spec = IndexerSpec::jackett("yts", server.uri()).with_api_key("abc");
    let client = HttpIndexerClient::new(&config(vec![spec.clone()])).expect("client");
    let payloads = client
        .fetch(&Query::new("ubuntu 22.04"), &spec)
        .await
        .expect("payloads");

    assert_eq!(payloads.len(), 3);
    assert!(payloads.iter().all(|p| matches!(p, RawPayload::Jackett(_))));
}

#[tokio::test]
async fn torznab_request_and_parse() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1/api"))
        .and(query_param("t", "search"))
        .and(query_param("q", "ubuntu"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/rss+xml")
                .set_body_string(TORZNAB_XML),
        )
        .expect(1)
        .mount(&server)
        .await;

    let spec = IndexerSpec::torznab("prowlarr-1", format!("{}/1", server.uri()));
    let client = HttpIndexerClient::new(&config(vec![spec.clone()])).expect("client");
    let payloads = client.fetch(&Query::new("ubuntu"), &spec).await.expect("payloads");

    assert_eq!(payloads.len(), 2);
    assert!(payloads.iter().all(|p| matches!(p, RawPayload::Torznab(_))));
}

#[tokio::test]
async fn server_error_is_unreachable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let spec = IndexerSpec::jackett("yts", server.uri()).with_api_key("s3cret");
    let client = HttpIndexerClient::new(&config(vec![spec.clone()])).expect("client");
    let err = client.fetch(&Query::new("x"), &spec).await.unwrap_err();

    assert!(matches!(err, SearchError::Unreachable(_)));
    assert!(err.to_string().contains("500"));
    assert!(!err.to_string().contains("s3cret"));
}

#[tokio::test]
async fn invalid_json_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let spec = IndexerSpec::jackett("yts", server.uri());
    let client = HttpIndexerClient::new(&config(vec![spec.clone()])).expect("client");
    let err = client.fetch(&Query::new("x"), &spec).await.unwrap_err();
    assert!(matches!(err, SearchError::MalformedResponse(_)));
}

#[tokio::test]
async fn connection_refused_is_unreachable() {
    // Bind then drop a server so the port is closed.
    let uri = {
        let server = MockServer::start().await;
        server.uri()
    };
    let spec = IndexerSpec::jackett("yts", uri);
    let client = HttpIndexerClient::new(&config(vec![spec.clone()])).expect("client");
    let err = client.fetch(&Query::new("x"), &spec).await.unwrap_err();
    assert!(matches!(err, SearchError::Unreachable(_)));
}

#[tokio::test]
async fn aggregator_merges_jackett_and_torznab() {
    let jackett = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2.0/indexers/yts/results"))
        .respond_with(ResponseTemplate::new(200).set_body_string(JACKETT_JSON))
        .mount(&jackett)
        .await;
    let torznab = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1/api"))
        .respond_with(ResponseTemplate::new(200).set_body_string(TORZNAB_XML))
        .mount(&torznab)
        .await;

    let aggregator = Aggregator::new(config(vec![
        IndexerSpec::jackett("yts", jackett.uri()),
        IndexerSpec::torznab("prowlarr-1", format!("{}/1", torznab.uri())),
    ]))
    .expect("aggregator");

    let set = aggregator.search(&Query::new("ubuntu 22.04")).await.expect("results");

    // Five listings; the two 1080p copies share an info hash.
    assert_eq!(set.records.len(), 4);
    assert_eq!(set.failed_indexers, 0);
    let merged = set
        .records
        .iter()
        .find(|r| r.record.sources.len() == 2)
        .expect("merged record");
    assert_eq!(
        merged.record.info_hash.as_deref(),
        Some("a1b2c3d4e5f6a7b8c9d0e1f2a3b4c5d6e7f8a9b0")
    );
    assert_eq!(merged.record.seeders, Some(412));
}

#[tokio::test]
async fn slow_indexer_times_out_while_others_answer() {
    let fast = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(JACKETT_JSON))
        .mount(&fast)
        .await;
    let slow = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(JACKETT_JSON)
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&slow)
        .await;

    let aggregator = Aggregator::new(config(vec![
        IndexerSpec::jackett("yts", fast.uri()),
        IndexerSpec::jackett("eztv", slow.uri()).with_timeout(Duration::from_millis(200)),
    ]))
    .expect("aggregator");

    let started = std::time::Instant::now();
    let set = aggregator.search(&Query::new("ubuntu")).await.expect("results");
    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(set.failed_indexers, 1);
    assert_eq!(set.failures[0].indexer, "eztv");
    assert_eq!(set.failures[0].kind, "timeout");
}
