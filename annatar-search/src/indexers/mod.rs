//! Indexer protocol implementations.
//!
//! Each module builds request URLs for one response shape and parses the
//! payload into its own item type. [`crate::indexer::HttpIndexerClient`]
//! dispatches to them by [`crate::types::IndexerKind`].

pub mod jackett;
pub mod torznab;

pub use jackett::JackettItem;
pub use torznab::TorznabItem;
