//! HTTP query endpoint.
//!
//! Routes:
//!
//! - `GET /health` liveness probe
//! - `GET /indexers` configured indexers, without secrets
//! - `GET /search` ranked results for one query

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query as QueryParams, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use annatar_search::{assemble, Aggregator, Category, IndexerClient, Query};

use crate::cache::{CacheKey, ResponseCache};
use crate::error::AppError;

/// Shared state handed to every handler.
pub struct AppState<C> {
    pub aggregator: Arc<Aggregator<C>>,
    pub cache: ResponseCache,
}

// Manual impl: `C` itself need not be `Clone`.
impl<C> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            aggregator: Arc::clone(&self.aggregator),
            cache: self.cache.clone(),
        }
    }
}

impl<C: IndexerClient + 'static> AppState<C> {
    pub fn new(aggregator: Aggregator<C>, cache: ResponseCache) -> Self {
        Self {
            aggregator: Arc::new(aggregator),
            cache,
        }
    }
}

/// Query string accepted by `GET /search`.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
    pub category: Option<String>,
    pub limit: Option<usize>,
    pub timeout_ms: Option<u64>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

impl SearchParams {
    /// Convert request parameters into an engine query.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::BadRequest`] for an unknown category or an
    /// episode without a season.
    pub fn into_query(self) -> Result<Query, AppError> {
        let mut query = Query::new(self.q);
        if let Some(raw) = self.category.as_deref().filter(|c| !c.trim().is_empty()) {
            let category: Category = raw
                .trim()
                .parse()
                .map_err(|_| AppError::BadRequest(format!("unknown category `{raw}`")))?;
            query = query.with_category(category);
        }
        if let Some(limit) = self.limit {
            query = query.with_max_results(limit);
        }
        if let Some(ms) = self.timeout_ms {
            query = query.with_timeout(Duration::from_millis(ms));
        }
        match (self.season, self.episode) {
            (Some(season), episode) => query = query.with_episode(season, episode),
            (None, Some(_)) => {
                return Err(AppError::BadRequest("episode requires season".into()));
            }
            (None, None) => {}
        }
        Ok(query)
    }
}

/// Build the service router.
pub fn router<C: IndexerClient + 'static>(state: AppState<C>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/indexers", get(list_indexers::<C>))
        .route("/search", get(search::<C>))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok"
    }))
}

async fn list_indexers<C: IndexerClient + 'static>(State(state): State<AppState<C>>) -> Response {
    Json(&state.aggregator.config().indexers).into_response()
}

async fn search<C: IndexerClient + 'static>(
    State(state): State<AppState<C>>,
    QueryParams(params): QueryParams<SearchParams>,
) -> Result<Response, AppError> {
    let query = params.into_query()?;
    let key = CacheKey::new(&query);

    if let Some(cached) = state.cache.get(&key).await {
        tracing::debug!("serving cached response");
        return Ok(Json(cached.as_ref()).into_response());
    }

    let set = state.aggregator.search(&query).await?;
    let response = Arc::new(assemble(&set, &query));
    state.cache.insert(key, Arc::clone(&response)).await;

    Ok(Json(response.as_ref()).into_response())
}

/// Resolve when the process receives Ctrl-C (or SIGTERM on Unix).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    tracing::info!("shutdown signal received");
}
