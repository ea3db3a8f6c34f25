use axum::{
    Router,
    extract::Extension,
    routing::{get, post},
};
use rating_cluster::config::AggregatorConfig;
use rating_cluster::content::handlers::{
    handle_add, handle_edit, handle_get, handle_get_all, handle_remove,
};
use rating_cluster::content::protocol::*;
use rating_cluster::content::store::ContentStore;
use rating_cluster::content::types::ContentType;
use rating_cluster::discovery::registry::RegistryService;
use rating_cluster::dispatcher::cache::ResponseCache;
use rating_cluster::dispatcher::handlers::handle_find;
use rating_cluster::dispatcher::service::Dispatcher;
use rating_cluster::store::cache::RedisCache;
use rating_cluster::store::document::MongoStore;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rating_cluster::init_tracing();

    let config = AggregatorConfig::from_env()?;
    tracing::info!("Starting rating service on {}", config.http_addr);

    // 1. Document store (required):
    let mongo = Arc::new(MongoStore::start(&config.mongo_url, &config.mongo_db).await?);
    let store: Arc<dyn ContentStore> = mongo.clone();

    // 2. Response cache (optional):
    let redis = match RedisCache::start(config.redis_sentinels.clone(), &config.redis_master).await {
        Ok(cache) => {
            tracing::info!("Response cache ready");
            Some(Arc::new(cache))
        }
        Err(e) => {
            tracing::warn!("Running without response cache: {}", e);
            None
        }
    };
    let cache = redis
        .clone()
        .map(|cache| cache as Arc<dyn ResponseCache>);

    // 3. Worker discovery:
    let registry = RegistryService::bind(config.multicast_addr, &config.interface)
        .await?
        .start();
    tracing::info!("Listening for parsers on {}", config.multicast_addr);

    let dispatcher = Arc::new(Dispatcher::new(registry.clone(), store.clone(), cache));

    // 4. HTTP Router:
    let app = Router::new()
        .route(ENDPOINT_FIND, get(handle_find))
        .route(ENDPOINT_GET, get(handle_get))
        .route(ENDPOINT_GET_ALL, get(handle_get_all))
        .route(ENDPOINT_ADD, post(handle_add))
        .route(ENDPOINT_EDIT, post(handle_edit))
        .route(ENDPOINT_REMOVE, post(handle_remove))
        .layer(Extension(dispatcher))
        .layer(Extension(store));

    // 5. Spawn stats reporter:
    let stats_registry = registry.clone();
    let stats_mongo = mongo.clone();
    let stats_redis = redis.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));

        loop {
            interval.tick().await;
            for content_type in ContentType::ALL {
                let parsers = stats_registry.query(content_type.as_str()).await;
                tracing::info!("Live {} parsers: {}", content_type, parsers.len());
                for entry in parsers {
                    tracing::debug!(
                        "  - {} http={}:{} from={}",
                        entry.announcement.name,
                        entry.announcement.http_host,
                        entry.announcement.http_port,
                        entry.source_addr
                    );
                }
            }

            let cache_active = match &stats_redis {
                Some(cache) => cache.is_active().await,
                None => false,
            };
            tracing::info!(
                "Stores: mongo active={} cache active={}",
                stats_mongo.is_active().await,
                cache_active
            );
        }
    });

    // 6. Start HTTP server:
    tracing::info!("HTTP server listening on {}", config.http_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(config.http_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(rating_cluster::shutdown_signal())
        .await?;

    // 7. Release the stores:
    if let Some(cache) = &redis {
        cache.close().await;
    }
    mongo.close().await;

    Ok(())
}
