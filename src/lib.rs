//! Annatar: multi-indexer torrent search aggregation service.
//!
//! Wraps the [`annatar_search`] engine in an HTTP service:
//! Request → cache lookup → fan-out to indexers → ranked JSON response
//!
//! # Architecture
//!
//! - **Config**: environment variables read once at startup ([`config`])
//! - **Server**: axum router exposing `/health`, `/indexers` and `/search`
//!   ([`server`])
//! - **Cache**: moka TTL cache of assembled responses ([`cache`])
//! - **Errors**: one service error type mapped onto HTTP statuses ([`error`])

pub mod cache;
pub mod config;
pub mod error;
pub mod server;

pub use config::AppConfig;
pub use error::{AppError, Result};
