//! Service configuration read from the environment at startup.
//!
//! Recognised variables:
//!
//! - `LISTEN_HOST` (default: `0.0.0.0`)
//! - `LISTEN_PORT` (default: `8000`)
//! - `JACKETT_URL` (optional; enables Jackett indexers)
//! - `JACKETT_API_KEY` (optional)
//! - `JACKETT_INDEXERS` (comma list, default: `all`)
//! - `JACKETT_TIMEOUT` (per-indexer seconds, default: 6)
//! - `SEARCH_TIMEOUT` (query deadline seconds, default: 10)
//! - `MAX_RESULTS` (default: 20)
//! - `MAX_CONCURRENCY` (default: 8)
//! - `SIMILARITY_THRESHOLD` (default: 0.8)
//! - `DIVERSIFY_RESOLUTIONS` (default: true)
//! - `CACHE_TTL` (seconds, default: 900; 0 disables caching)
//! - `INDEXERS_FILE` (optional TOML file with `[[indexer]]` entries)

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use annatar_search::{IndexerSpec, SearchConfig};
use serde::Deserialize;

use crate::error::AppError;

/// Complete service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Lifetime of cached responses. Zero disables the cache.
    pub cache_ttl: Duration,
    pub search: SearchConfig,
}

/// Layout of `INDEXERS_FILE`.
#[derive(Debug, Deserialize)]
struct IndexersFile {
    #[serde(default, rename = "indexer")]
    indexers: Vec<IndexerSpec>,
}

impl AppConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] if a variable fails to parse, the
    /// indexers file is unreadable, or the resulting search configuration
    /// is invalid.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`AppConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());
        let defaults = SearchConfig::default();

        let mut indexers = Vec::new();
        if let Some(url) = var("JACKETT_URL") {
            let api_key = var("JACKETT_API_KEY");
            let ids = var("JACKETT_INDEXERS").unwrap_or_else(|| "all".to_owned());
            for id in ids.split(',').map(str::trim).filter(|id| !id.is_empty()) {
                let mut spec = IndexerSpec::jackett(id, url.as_str());
                if let Some(key) = &api_key {
                    spec = spec.with_api_key(key.as_str());
                }
                indexers.push(spec);
            }
        }
        if let Some(path) = var("INDEXERS_FILE") {
            indexers.extend(load_indexers_file(Path::new(&path))?);
        }

        let search = SearchConfig {
            indexers,
            max_results: parse_or(&var, "MAX_RESULTS", defaults.max_results)?,
            default_indexer_timeout: secs_or(&var, "JACKETT_TIMEOUT", defaults.default_indexer_timeout)?,
            global_timeout: secs_or(&var, "SEARCH_TIMEOUT", defaults.global_timeout)?,
            max_concurrency: parse_or(&var, "MAX_CONCURRENCY", defaults.max_concurrency)?,
            similarity_threshold: parse_or(&var, "SIMILARITY_THRESHOLD", defaults.similarity_threshold)?,
            diversify_resolutions: bool_or(&var, "DIVERSIFY_RESOLUTIONS", defaults.diversify_resolutions)?,
            ..defaults
        };
        search.validate().map_err(|e| AppError::Config(e.to_string()))?;

        Ok(Self {
            host: var("LISTEN_HOST").unwrap_or_else(|| "0.0.0.0".to_owned()),
            port: parse_or(&var, "LISTEN_PORT", 8000)?,
            cache_ttl: Duration::from_secs(parse_or(&var, "CACHE_TTL", 900)?),
            search,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Read `[[indexer]]` entries from a TOML file.
///
/// # Errors
///
/// Returns [`AppError::Config`] if the file cannot be read or parsed.
pub fn load_indexers_file(path: &Path) -> Result<Vec<IndexerSpec>, AppError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        AppError::Config(format!("cannot read indexers file {}: {e}", path.display()))
    })?;
    let file: IndexersFile = toml::from_str(&text).map_err(|e| {
        AppError::Config(format!("invalid indexers file {}: {e}", path.display()))
    })?;
    Ok(file.indexers)
}

fn parse_or<T, V>(var: &V, key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    V: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| AppError::Config(format!("{key} has invalid value `{raw}`"))),
        None => Ok(default),
    }
}

fn secs_or<V>(var: &V, key: &str, default: Duration) -> Result<Duration, AppError>
where
    V: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .parse::<f64>()
            .ok()
            .filter(|s| s.is_finite() && *s >= 0.0)
            .and_then(|s| Duration::try_from_secs_f64(s).ok())
            .ok_or_else(|| AppError::Config(format!("{key} has invalid value `{raw}`"))),
        None => Ok(default),
    }
}

fn bool_or<V>(var: &V, key: &str, default: bool) -> Result<bool, AppError>
where
    V: Fn(&str) -> Option<String>,
{
    match var(key).map(|v| v.to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => Err(AppError::Config(format!("{key} has invalid value `{v}`"))),
    }
}
