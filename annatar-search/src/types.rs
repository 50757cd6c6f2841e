//! Core types: queries, indexer descriptions, raw and canonical results.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SearchError;
use crate::indexers::{JackettItem, TorznabItem};

/// Content category a query targets and an indexer may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Feature films.
    Movie,
    /// Television series (optionally narrowed by season/episode).
    Series,
}

impl Category {
    /// Newznab/Torznab category code for this category.
    pub fn newznab_code(&self) -> u32 {
        match self {
            Self::Movie => 2000,
            Self::Series => 5000,
        }
    }

    /// Returns the lowercase name used on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Series => "series",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Category {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "movie" | "movies" => Ok(Self::Movie),
            "series" | "tv" | "show" => Ok(Self::Series),
            other => Err(SearchError::Config(format!("unknown category `{other}`"))),
        }
    }
}

/// A single search request. Immutable once dispatched.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Free-text search terms.
    pub terms: String,
    /// Restrict to indexers supporting this category.
    pub category: Option<Category>,
    /// Season number for series queries.
    pub season: Option<u32>,
    /// Episode number for series queries (requires `season`).
    pub episode: Option<u32>,
    /// Per-query result cap; the configured maximum still applies.
    pub max_results: Option<usize>,
    /// Per-query time budget; the configured global timeout still applies.
    pub timeout: Option<Duration>,
}

impl Query {
    /// Create a query with only search terms set.
    pub fn new(terms: impl Into<String>) -> Self {
        Self {
            terms: terms.into(),
            category: None,
            season: None,
            episode: None,
            max_results: None,
            timeout: None,
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_episode(mut self, season: u32, episode: Option<u32>) -> Self {
        self.season = Some(season);
        self.episode = episode;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Search terms with an `SxxEyy` suffix for indexers without native
    /// season/episode parameters.
    pub fn expanded_terms(&self) -> String {
        let terms = self.terms.trim();
        match (self.season, self.episode) {
            (Some(s), Some(e)) => format!("{terms} S{s:02}E{e:02}"),
            (Some(s), None) => format!("{terms} S{s:02}"),
            _ => terms.to_string(),
        }
    }

    /// Rejects queries that can never produce a meaningful request.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.terms.trim().is_empty() {
            return Err(SearchError::Config("query terms must not be empty".into()));
        }
        if self.max_results == Some(0) {
            return Err(SearchError::Config(
                "max_results must be greater than 0".into(),
            ));
        }
        if self.timeout == Some(Duration::ZERO) {
            return Err(SearchError::Config("timeout must be greater than 0".into()));
        }
        if self.episode.is_some() && self.season.is_none() {
            return Err(SearchError::Config("episode requires a season".into()));
        }
        Ok(())
    }
}

/// Response shape an indexer speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexerKind {
    /// Jackett's JSON results API.
    Jackett,
    /// Torznab RSS/XML API.
    Torznab,
}

impl IndexerKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Jackett => "jackett",
            Self::Torznab => "torznab",
        }
    }
}

impl fmt::Display for IndexerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Static description of one backend indexer.
///
/// Built once at startup and shared read-only between queries.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexerSpec {
    /// Identifier; for Jackett this is also the indexer id in the URL path.
    pub id: String,
    /// Base URL of the indexer backend.
    pub endpoint: String,
    /// Which response parser applies.
    pub kind: IndexerKind,
    /// API key sent as `apikey`. Never serialized or logged.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Categories this indexer can answer. Empty means all.
    #[serde(default)]
    pub categories: Vec<Category>,
    /// Disabled indexers are never queried.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Overrides the configured default per-indexer timeout.
    #[serde(default, with = "duration_ms_opt", rename = "timeout_ms")]
    pub timeout: Option<Duration>,
    /// Ranking weight; higher means more trusted.
    #[serde(default = "default_trust")]
    pub trust: f64,
}

fn default_enabled() -> bool {
    true
}

fn default_trust() -> f64 {
    1.0
}

impl IndexerSpec {
    /// A Jackett-backed indexer with default capabilities.
    pub fn jackett(id: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            endpoint: endpoint.into(),
            kind: IndexerKind::Jackett,
            api_key: None,
            categories: Vec::new(),
            enabled: true,
            timeout: None,
            trust: 1.0,
        }
    }

    /// A Torznab-backed indexer with default capabilities.
    pub fn torznab(id: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            kind: IndexerKind::Torznab,
            ..Self::jackett(id, endpoint)
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_categories(mut self, categories: Vec<Category>) -> Self {
        self.categories = categories;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_trust(mut self, trust: f64) -> Self {
        self.trust = trust;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Whether this indexer can answer queries for `category`.
    pub fn supports(&self, category: Option<Category>) -> bool {
        match category {
            None => true,
            Some(c) => self.categories.is_empty() || self.categories.contains(&c),
        }
    }
}

impl fmt::Debug for IndexerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexerSpec")
            .field("id", &self.id)
            .field("endpoint", &self.endpoint)
            .field("kind", &self.kind)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("categories", &self.categories)
            .field("enabled", &self.enabled)
            .field("timeout", &self.timeout)
            .field("trust", &self.trust)
            .finish()
    }
}

mod duration_ms_opt {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}

/// Position at which a raw result reached the coordinator.
///
/// `response` counts completed indexer responses in completion order;
/// `position` is the index inside that response. Ordering by this value
/// gives "earliest-responding source first".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Arrival {
    pub response: usize,
    pub position: usize,
}

/// Indexer-specific payload, one variant per response shape.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    Jackett(JackettItem),
    Torznab(TorznabItem),
}

/// A result exactly as an indexer returned it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResult {
    /// Id of the originating [`IndexerSpec`].
    pub indexer: String,
    /// Set by the coordinator when the response is collected.
    pub arrival: Arrival,
    pub payload: RawPayload,
}

/// Video resolution parsed from a release title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "unknown")]
    Unknown,
    #[serde(rename = "480p")]
    Sd,
    #[serde(rename = "720p")]
    Hd720,
    #[serde(rename = "1080p")]
    Hd1080,
    #[serde(rename = "2160p")]
    Uhd,
}

impl Resolution {
    /// Parse the resolution tag out of a release title.
    pub fn from_title(title: &str) -> Self {
        let lower = title.to_ascii_lowercase();
        let tokens: Vec<&str> = lower
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();
        let has = |tags: &[&str]| tokens.iter().any(|t| tags.contains(t));

        if has(&["2160p", "4k", "uhd"]) {
            Self::Uhd
        } else if has(&["1080p", "1080i", "fhd"]) {
            Self::Hd1080
        } else if has(&["720p"]) {
            Self::Hd720
        } else if has(&["480p", "576p", "sd", "dvdrip"]) {
            Self::Sd
        } else {
            Self::Unknown
        }
    }

    /// Quality rank in `[0, 1]` used by ranking.
    pub fn quality(&self) -> f64 {
        match self {
            Self::Uhd => 1.0,
            Self::Hd1080 => 0.8,
            Self::Hd720 => 0.6,
            Self::Sd => 0.3,
            Self::Unknown => 0.4,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Uhd => "2160p",
            Self::Hd1080 => "1080p",
            Self::Hd720 => "720p",
            Self::Sd => "480p",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One indexer that contributed to a canonical record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub indexer: String,
    pub arrival: Arrival,
}

/// A normalized result, independent of which indexer produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub title: String,
    /// Size in bytes; 0 when the indexer did not report one.
    pub size: u64,
    pub seeders: Option<u32>,
    pub peers: Option<u32>,
    /// Lowercase hex BitTorrent info hash.
    pub info_hash: Option<String>,
    pub magnet: Option<String>,
    pub link: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub resolution: Resolution,
    /// Indexer whose record was kept as the canonical one.
    pub origin: String,
    /// Every contributing indexer, earliest arrival first. Always contains
    /// `origin`.
    pub sources: Vec<Source>,
    /// Identity key used for duplicate detection.
    pub fingerprint: String,
}

impl CanonicalRecord {
    /// Arrival of the earliest contributing source.
    pub fn first_arrival(&self) -> Arrival {
        self.sources
            .iter()
            .map(|s| s.arrival)
            .min()
            .unwrap_or(Arrival {
                response: usize::MAX,
                position: usize::MAX,
            })
    }

    /// How many optional metadata fields are populated.
    pub fn completeness(&self) -> usize {
        [
            self.seeders.is_some(),
            self.peers.is_some(),
            self.info_hash.is_some(),
            self.magnet.is_some() || self.link.is_some(),
            self.published.is_some(),
            self.size > 0,
        ]
        .into_iter()
        .filter(|present| *present)
        .count()
    }
}

/// A canonical record with its ranking score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRecord {
    pub record: CanonicalRecord,
    pub score: f64,
}

/// Why one indexer contributed nothing to a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexerFailure {
    pub indexer: String,
    /// Stable label from [`SearchError::kind`].
    pub kind: String,
    pub message: String,
}

impl IndexerFailure {
    pub fn new(indexer: impl Into<String>, err: &SearchError) -> Self {
        Self {
            indexer: indexer.into(),
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Final ranked output for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    pub records: Vec<RankedRecord>,
    /// Indexers a request was dispatched to.
    pub queried_indexers: usize,
    /// Indexers that failed, timed out, or were cancelled by the deadline.
    pub failed_indexers: usize,
    pub failures: Vec<IndexerFailure>,
    /// The global deadline expired before every indexer answered.
    pub partial: bool,
    pub elapsed: Duration,
}
