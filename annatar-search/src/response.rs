//! Serialisable response shape for a finished search.
//!
//! [`assemble`] only reads the [`ResultSet`]; records, their order and
//! their scores come out exactly as ranked.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{IndexerFailure, Query, RankedRecord, Resolution, ResultSet};

/// One ranked result as exposed to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEntry {
    pub title: String,
    /// Size in bytes; 0 when no indexer reported one.
    pub size: u64,
    pub size_human: String,
    pub seeders: Option<u32>,
    pub peers: Option<u32>,
    pub resolution: Resolution,
    pub info_hash: Option<String>,
    pub magnet: Option<String>,
    pub link: Option<String>,
    pub published: Option<DateTime<Utc>>,
    /// Contributing indexers, earliest responder first.
    pub sources: Vec<String>,
    pub origin: String,
    pub fingerprint: String,
    pub score: f64,
}

impl From<&RankedRecord> for ResultEntry {
    fn from(ranked: &RankedRecord) -> Self {
        let r = &ranked.record;
        Self {
            title: r.title.clone(),
            size: r.size,
            size_human: human_bytes(r.size),
            seeders: r.seeders,
            peers: r.peers,
            resolution: r.resolution,
            info_hash: r.info_hash.clone(),
            magnet: r.magnet.clone(),
            link: r.link.clone(),
            published: r.published,
            sources: r.sources.iter().map(|s| s.indexer.clone()).collect(),
            origin: r.origin.clone(),
            fingerprint: r.fingerprint.clone(),
            score: ranked.score,
        }
    }
}

/// Complete response for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<ResultEntry>,
    pub queried_indexers: usize,
    pub failed_indexers: usize,
    /// Set when the query deadline cut off at least one indexer.
    pub partial: bool,
    pub failures: Vec<IndexerFailure>,
    pub elapsed_ms: u64,
}

/// Build the response for `query` from its ranked result set.
pub fn assemble(set: &ResultSet, query: &Query) -> SearchResponse {
    SearchResponse {
        query: query.expanded_terms(),
        results: set.records.iter().map(ResultEntry::from).collect(),
        queried_indexers: set.queried_indexers,
        failed_indexers: set.failed_indexers,
        partial: set.partial,
        failures: set.failures.clone(),
        elapsed_ms: u64::try_from(set.elapsed.as_millis()).unwrap_or(u64::MAX),
    }
}

/// Format a byte count with binary units, e.g. `1.5 GiB`.
pub fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Arrival, CanonicalRecord, Source};
    use std::time::Duration;

    fn ranked(title: &str, score: f64, indexers: &[&str]) -> RankedRecord {
        RankedRecord {
            record: CanonicalRecord {
                title: title.into(),
                size: 1_610_612_736,
                seeders: Some(12),
                peers: None,
                info_hash: None,
                magnet: None,
                link: Some("http://jackett/dl/1".into()),
                published: None,
                resolution: Resolution::from_title(title),
                origin: indexers[0].into(),
                sources: indexers
                    .iter()
                    .enumerate()
                    .map(|(i, id)| Source {
                        indexer: (*id).into(),
                        arrival: Arrival { response: i, position: 0 },
                    })
                    .collect(),
                fingerprint: title.to_lowercase(),
            },
            score,
        }
    }

    fn result_set() -> ResultSet {
        ResultSet {
            records: vec![
                ranked("Ubuntu 1080p", 0.9, &["yts", "eztv"]),
                ranked("Ubuntu 720p", 0.4, &["eztv"]),
            ],
            queried_indexers: 3,
            failed_indexers: 1,
            failures: vec![IndexerFailure {
                indexer: "1337x".into(),
                kind: "timeout".into(),
                message: "timed out: 1337x".into(),
            }],
            partial: true,
            elapsed: Duration::from_millis(1234),
        }
    }

    #[test]
    fn assemble_preserves_order_and_scores() {
        let set = result_set();
        let before = set.clone();
        let response = assemble(&set, &Query::new("ubuntu"));

        assert_eq!(set, before);
        assert_eq!(response.results.len(), 2);
        assert_eq!(response.results[0].title, "Ubuntu 1080p");
        assert!((response.results[0].score - 0.9).abs() < f64::EPSILON);
        assert_eq!(response.results[0].sources, vec!["yts", "eztv"]);
        assert_eq!(response.results[1].resolution, Resolution::Hd720);
    }

    #[test]
    fn assemble_carries_counts() {
        let response = assemble(&result_set(), &Query::new("ubuntu").with_episode(1, Some(2)));
        assert_eq!(response.query, "ubuntu S01E02");
        assert_eq!(response.queried_indexers, 3);
        assert_eq!(response.failed_indexers, 1);
        assert!(response.partial);
        assert_eq!(response.elapsed_ms, 1234);
        assert_eq!(response.failures[0].kind, "timeout");
    }

    #[test]
    fn response_serializes_to_json() {
        let response = assemble(&result_set(), &Query::new("ubuntu"));
        let json = serde_json::to_value(&response).expect("serialize");
        assert_eq!(json["results"][0]["resolution"], "1080p");
        assert_eq!(json["results"][0]["size_human"], "1.5 GiB");
        assert_eq!(json["failed_indexers"], 1);
    }

    #[test]
    fn human_bytes_units() {
        assert_eq!(human_bytes(0), "0 B");
        assert_eq!(human_bytes(1023), "1023 B");
        assert_eq!(human_bytes(1536), "1.5 KiB");
        assert_eq!(human_bytes(8_589_934_592), "8.0 GiB");
    }
}
