use axum::{Router, extract::Extension, routing::get};
use rating_cluster::config::WorkerConfig;
use rating_cluster::content::protocol::ENDPOINT_WORKER_FIND;
use rating_cluster::discovery::announcer::Announcer;
use rating_cluster::worker::ContentSource;
use rating_cluster::worker::catalog::CatalogSource;
use rating_cluster::worker::handlers::handle_find;
use rating_cluster::worker::identity;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rating_cluster::init_tracing();

    let config = WorkerConfig::from_env()?;
    tracing::info!(
        "Starting {} ({}) on {}:{}",
        config.parser_name,
        config.parser_type,
        config.http_host,
        config.http_port
    );

    // 1. Content source:
    let source = match &config.catalog_path {
        Some(path) => CatalogSource::load(path, config.parser_type).await?,
        None => {
            tracing::warn!("CATALOG_PATH not set, serving an empty catalog");
            CatalogSource::from_units(config.parser_type, Vec::new())
        }
    };
    let source: Arc<dyn ContentSource> = Arc::new(source);

    // 2. Announce on the discovery group:
    let announcement = identity::announcement(
        &config.parser_name,
        config.parser_type,
        &config.http_host,
        config.http_port,
    );
    tracing::info!("Content hash: {}", announcement.content_hash);
    let announcer = Announcer::new(&announcement, config.multicast_addr)?.start();

    // 3. HTTP Router:
    let app = Router::new()
        .route(ENDPOINT_WORKER_FIND, get(handle_find))
        .layer(Extension(source));

    // 4. Start HTTP server:
    let http_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.http_port));
    tracing::info!("HTTP server listening on {}", http_addr);

    let listener = tokio::net::TcpListener::bind(http_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(rating_cluster::shutdown_signal())
        .await?;

    announcer.abort();
    Ok(())
}
