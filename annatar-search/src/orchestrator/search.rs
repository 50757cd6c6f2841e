//! Fan-out coordinator and the full aggregation pipeline.
//!
//! Queries every eligible indexer concurrently (bounded by
//! `max_concurrency`), collects successful responses until all indexers
//! answer or the query deadline passes, then normalises, deduplicates,
//! ranks and truncates the union of results.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::time::Instant;
use tracing::field::Empty;
use tracing::Instrument;

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::indexer::{fetch_with_timeout, IndexerClient};
use crate::types::{Arrival, IndexerFailure, IndexerSpec, Query, RawPayload, RawResult, ResultSet};

use super::dedup::deduplicate;
use super::normalize::normalize_all;
use super::scoring::{rank, truncate};

/// Everything the coordinator collected for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct FanOut {
    /// Union of successful responses, in collection order.
    pub results: Vec<RawResult>,
    /// Indexers a request was dispatched to (or queued for).
    pub queried: usize,
    /// One entry per indexer that failed, timed out or was cancelled.
    pub failures: Vec<IndexerFailure>,
    /// The query deadline expired before every indexer answered.
    pub deadline_hit: bool,
}

/// Run one indexer with its own timeout, tagging the outcome with its slot.
async fn query_indexer<C: IndexerClient>(
    client: &C,
    config: &SearchConfig,
    query: &Query,
    slot: usize,
    spec: &IndexerSpec,
) -> (usize, Result<Vec<RawPayload>, SearchError>) {
    let timeout = config.indexer_timeout(spec);
    (slot, fetch_with_timeout(client, query, spec, timeout).await)
}

/// Dispatch `query` to every eligible indexer and collect what comes back.
///
/// # Pipeline
///
/// 1. Select enabled indexers that support the query's category
/// 2. Start up to `max_concurrency` requests; start the next queued
///    indexer whenever one finishes
/// 3. Log per-indexer failures at warn level and record them
/// 4. Stop at the query deadline: pending requests are dropped (cancelled)
///    and counted as timed out
///
/// Never fails: partial results are the normal outcome.
pub async fn fan_out<C: IndexerClient>(client: &C, config: &SearchConfig, query: &Query) -> FanOut {
    let specs = config.eligible_indexers(query.category);
    let deadline = Instant::now() + config.effective_timeout(query);

    let mut finished = vec![false; specs.len()];
    let mut results: Vec<RawResult> = Vec::new();
    let mut failures: Vec<IndexerFailure> = Vec::new();
    let mut deadline_hit = false;
    let mut responses = 0usize;

    let mut queue = specs.iter().copied().enumerate();
    let mut in_flight = FuturesUnordered::new();
    for (slot, spec) in queue.by_ref().take(config.max_concurrency) {
        in_flight.push(query_indexer(client, config, query, slot, spec));
    }

    loop {
        match tokio::time::timeout_at(deadline, in_flight.next()).await {
            Ok(Some((slot, outcome))) => {
                finished[slot] = true;
                let spec = specs[slot];
                let response = responses;
                responses += 1;

                match outcome {
                    Ok(payloads) => {
                        tracing::debug!(indexer = %spec.id, count = payloads.len(), "indexer returned results");
                        results.extend(payloads.into_iter().enumerate().map(|(position, payload)| {
                            RawResult {
                                indexer: spec.id.clone(),
                                arrival: Arrival { response, position },
                                payload,
                            }
                        }));
                    }
                    Err(err) => {
                        tracing::warn!(indexer = %spec.id, error = %err, "indexer query failed");
                        failures.push(IndexerFailure::new(&spec.id, &err));
                    }
                }

                if let Some((next_slot, next_spec)) = queue.next() {
                    in_flight.push(query_indexer(client, config, query, next_slot, next_spec));
                }
            }
            Ok(None) => break,
            Err(_) => {
                deadline_hit = true;
                break;
            }
        }
    }

    // Dropping the set cancels whatever is still in flight.
    drop(in_flight);

    if deadline_hit {
        for (slot, spec) in specs.iter().enumerate() {
            if !finished[slot] {
                let err = SearchError::Timeout(format!(
                    "{} cancelled at the query deadline",
                    spec.id
                ));
                tracing::warn!(indexer = %spec.id, "indexer cancelled at query deadline");
                failures.push(IndexerFailure::new(&spec.id, &err));
            }
        }
    }

    FanOut {
        results,
        queried: specs.len(),
        failures,
        deadline_hit,
    }
}

/// Orchestrate a complete search: fan-out, normalise, dedup, rank, truncate.
///
/// `now` is the reference instant for recency scoring.
///
/// # Errors
///
/// - [`SearchError::Config`] if the query is invalid
/// - [`SearchError::NoResultsAvailable`] if no indexer is eligible, or if
///   every indexer failed or returned nothing
pub async fn orchestrate_search<C: IndexerClient>(
    client: &C,
    config: &SearchConfig,
    query: &Query,
    now: DateTime<Utc>,
) -> Result<ResultSet, SearchError> {
    query.validate()?;
    let span = search_span(query);
    run_pipeline(client, config, query, now, &span)
        .instrument(span.clone())
        .await
}

/// Span covering one query. Terms stay out of it; outcome fields are
/// recorded as the pipeline progresses.
fn search_span(query: &Query) -> tracing::Span {
    tracing::info_span!(
        "search",
        category = query.category.map_or("any", |c| c.name()),
        queried = Empty,
        failed = Empty,
        partial = Empty,
        elapsed_ms = Empty,
    )
}

async fn run_pipeline<C: IndexerClient>(
    client: &C,
    config: &SearchConfig,
    query: &Query,
    now: DateTime<Utc>,
    span: &tracing::Span,
) -> Result<ResultSet, SearchError> {
    let started = Instant::now();

    let fan_out = fan_out(client, config, query).await;
    span.record("queried", fan_out.queried);
    span.record("failed", fan_out.failures.len());
    span.record("partial", fan_out.deadline_hit);

    if fan_out.queried == 0 {
        let category = query.category.map_or("any", |c| c.name());
        return Err(SearchError::NoResultsAvailable(format!(
            "no enabled indexer supports category `{category}`"
        )));
    }

    if fan_out.results.is_empty() {
        let detail = if fan_out.failures.is_empty() {
            format!("{} indexers returned no results", fan_out.queried)
        } else {
            fan_out
                .failures
                .iter()
                .map(|f| f.message.as_str())
                .collect::<Vec<_>>()
                .join("; ")
        };
        tracing::warn!(queried = fan_out.queried, failed = fan_out.failures.len(), "no results available");
        return Err(SearchError::NoResultsAvailable(detail));
    }

    let raw_count = fan_out.results.len();
    let records = normalize_all(fan_out.results);
    let deduped = deduplicate(records, config.similarity_threshold);
    let merged_count = deduped.len();

    let trust: HashMap<String, f64> = config
        .indexers
        .iter()
        .map(|spec| (spec.id.clone(), spec.trust))
        .collect();
    let ranked = rank(deduped, &trust, now);
    let records = truncate(
        ranked,
        config.effective_max_results(query),
        config.diversify_resolutions,
    );

    let elapsed = started.elapsed();
    span.record("elapsed_ms", elapsed.as_millis() as u64);
    tracing::info!(
        queried = fan_out.queried,
        failed = fan_out.failures.len(),
        raw = raw_count,
        merged = merged_count,
        returned = records.len(),
        partial = fan_out.deadline_hit,
        elapsed_ms = elapsed.as_millis() as u64,
        "search complete"
    );

    Ok(ResultSet {
        records,
        queried_indexers: fan_out.queried,
        failed_indexers: fan_out.failures.len(),
        failures: fan_out.failures,
        partial: fan_out.deadline_hit,
        elapsed,
    })
}
