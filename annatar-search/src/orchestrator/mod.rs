//! Search orchestrator: concurrent fan-out, normalisation, dedup, ranking.
//!
//! This module fans a query out to every eligible indexer concurrently,
//! maps each response onto one canonical record shape, merges records that
//! describe the same release, and returns a ranked, truncated result set.

pub mod dedup;
pub mod fingerprint;
pub mod normalize;
pub mod scoring;
pub mod search;

pub use search::{fan_out, orchestrate_search, FanOut};
