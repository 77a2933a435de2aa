use std::sync::Arc;

use marquee_api::config::Config;
use marquee_api::db::{
    create_redis_client, CacheWriterHandle, CatalogStore, MemoryCatalogStore, MemoryResultCache,
    MemoryWatchHistoryStore, RedisResultCache, ResultCache, WatchHistoryStore,
};
use marquee_api::routes::{create_router, AppState};
use marquee_api::services::{EngineConfig, RecommendationEngine};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration and wire up tracing
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Seed the stores, from fixture files when configured
    let catalog: Arc<dyn CatalogStore> = Arc::new(match &config.catalog_path {
        Some(path) => MemoryCatalogStore::from_json_file(path)?,
        None => {
            tracing::warn!("No catalog fixture configured, starting with an empty catalog");
            MemoryCatalogStore::empty()
        }
    });
    let history: Arc<dyn WatchHistoryStore> = Arc::new(match &config.history_path {
        Some(path) => MemoryWatchHistoryStore::from_json_file(path)?,
        None => {
            tracing::warn!("No watch-history fixture configured, starting with empty history");
            MemoryWatchHistoryStore::empty()
        }
    });

    // 3. Pick the result cache backend
    let (cache, cache_writer): (Arc<dyn ResultCache>, Option<CacheWriterHandle>) =
        match &config.redis_url {
            Some(url) => {
                let client = create_redis_client(url)?;
                let (cache, writer) = RedisResultCache::new(client).await;
                tracing::info!("Using redis result cache");
                (Arc::new(cache), Some(writer))
            }
            None => {
                tracing::info!(
                    max_entries = config.cache_max_entries,
                    "Using in-memory result cache"
                );
                (
                    Arc::new(MemoryResultCache::new(config.cache_max_entries)),
                    None,
                )
            }
        };

    // 4. Assemble the engine and router
    let engine = RecommendationEngine::new(
        catalog,
        history,
        cache,
        EngineConfig {
            diversity_ratio: config.diversity_ratio,
            cache_ttl_seconds: config.cache_ttl_seconds,
            pad_empty_results: config.pad_empty_results,
        },
    );
    let app = create_router(AppState::new(Arc::new(engine)));

    // 5. Serve until interrupted
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 6. Flush any pending cache writes before exiting
    if let Some(writer) = cache_writer {
        writer.shutdown().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
