//! Composite ranking and truncation of deduplicated records.
//!
//! Score formula:
//!
//! ```text
//! score = trust * (0.45 * availability + 0.20 * recency + 0.35 * quality) * boost
//!
//! availability = min(ln(1 + seeders) / ln(1001), 1.0)     (0 when unknown)
//! recency      = 0.5 ^ (age_days / 180)                   (0.25 when unknown)
//! quality      = Resolution::quality()
//! trust        = max trust weight over contributing indexers
//! boost        = min(1.0 + 0.1 * (sources - 1), 1.5)
//! ```
//!
//! The reference instant for recency is passed in, so ranking the same
//! input twice always yields the same order.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::types::{CanonicalRecord, RankedRecord, Resolution};

const AVAILABILITY_WEIGHT: f64 = 0.45;
const RECENCY_WEIGHT: f64 = 0.20;
const QUALITY_WEIGHT: f64 = 0.35;

/// Seeder count at which availability saturates.
const SEEDER_SATURATION: f64 = 1000.0;
const RECENCY_HALF_LIFE_DAYS: f64 = 180.0;
const UNKNOWN_RECENCY: f64 = 0.25;

/// Per-extra-source multiplier and its cap.
const SOURCE_BOOST_STEP: f64 = 0.1;
const SOURCE_BOOST_CAP: f64 = 1.5;

/// Availability signal in `[0, 1]` from the seeder count.
pub fn availability(seeders: Option<u32>) -> f64 {
    let Some(seeders) = seeders else {
        return 0.0;
    };
    ((1.0 + f64::from(seeders)).ln() / (1.0 + SEEDER_SATURATION).ln()).min(1.0)
}

/// Recency signal in `(0, 1]`, halving every [`RECENCY_HALF_LIFE_DAYS`].
/// Future dates count as brand new.
pub fn recency(published: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    let Some(published) = published else {
        return UNKNOWN_RECENCY;
    };
    let age_days = (now - published).num_seconds().max(0) as f64 / 86_400.0;
    0.5_f64.powf(age_days / RECENCY_HALF_LIFE_DAYS)
}

/// Multiplier rewarding releases listed by several indexers.
pub fn cross_source_boost(source_count: usize) -> f64 {
    let extra = source_count.saturating_sub(1) as f64;
    (1.0 + SOURCE_BOOST_STEP * extra).min(SOURCE_BOOST_CAP)
}

/// Score one record. `trust` maps indexer ids to their weight; unknown
/// indexers weigh 1.0.
pub fn calculate_score(
    record: &CanonicalRecord,
    trust: &HashMap<String, f64>,
    now: DateTime<Utc>,
) -> f64 {
    let trust_weight = record
        .sources
        .iter()
        .map(|s| trust.get(&s.indexer).copied().unwrap_or(1.0))
        .fold(f64::NEG_INFINITY, f64::max);
    let trust_weight = if trust_weight.is_finite() { trust_weight } else { 1.0 };

    let base = AVAILABILITY_WEIGHT * availability(record.seeders)
        + RECENCY_WEIGHT * recency(record.published, now)
        + QUALITY_WEIGHT * record.resolution.quality();

    trust_weight * base * cross_source_boost(record.sources.len())
}

/// Score and order records, best first.
///
/// The sort is stable, so equal scores keep their input order.
pub fn rank(
    records: Vec<CanonicalRecord>,
    trust: &HashMap<String, f64>,
    now: DateTime<Utc>,
) -> Vec<RankedRecord> {
    let mut ranked: Vec<RankedRecord> = records
        .into_iter()
        .map(|record| RankedRecord {
            score: calculate_score(&record, trust, now),
            record,
        })
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}

/// Keep at most `max_results` records.
///
/// With `diversify` set, each resolution contributes at most
/// `ceil(max_results / 2)` records; the skipped ones do not make room for
/// later entries of the same resolution.
pub fn truncate(mut ranked: Vec<RankedRecord>, max_results: usize, diversify: bool) -> Vec<RankedRecord> {
    if !diversify {
        ranked.truncate(max_results);
        return ranked;
    }

    let per_resolution = max_results.div_ceil(2);
    let mut taken: HashMap<Resolution, usize> = HashMap::new();
    let mut out = Vec::with_capacity(max_results.min(ranked.len()));

    for entry in ranked {
        if out.len() >= max_results {
            break;
        }
        let count = taken.entry(entry.record.resolution).or_insert(0);
        if *count >= per_resolution {
            tracing::trace!(resolution = %entry.record.resolution, "resolution cap reached");
            continue;
        }
        *count += 1;
        out.push(entry);
    }
    out
}
