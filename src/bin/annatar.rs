//! Annatar service binary.
//!
//! Reads configuration from the environment, binds the HTTP listener and
//! serves until Ctrl-C or SIGTERM. Logs go to stderr; set `RUST_LOG` to
//! override the default filter.

use annatar::cache::ResponseCache;
use annatar::config::AppConfig;
use annatar::server::{self, AppState};
use annatar_search::Aggregator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("annatar=info,annatar_search=info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(
        indexers = config.search.indexers.len(),
        max_results = config.search.max_results,
        cache_ttl_secs = config.cache_ttl.as_secs(),
        "annatar starting"
    );

    let aggregator = Aggregator::new(config.search.clone())?;
    let state = AppState::new(aggregator, ResponseCache::new(config.cache_ttl));
    let app = server::router(state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr()).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!("annatar listening on http://{local_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(server::shutdown_signal())
        .await?;

    tracing::info!("annatar stopped");
    Ok(())
}
