//! Rating Cluster Library
//!
//! Core of the content rating service: an aggregator that discovers parser
//! workers on a multicast group, fans user searches out to them, and keeps
//! the answers in a document store with a response cache in front.
//! It serves two binaries: the aggregator (`main.rs`) and a parser worker
//! (`bin/parser.rs`).
//!
//! ## Architecture Modules
//! - **`discovery`**: worker announcements over UDP multicast and the registry
//!   of live workers, with a 2 second liveness window.
//! - **`dispatcher`**: the find pipeline. Cache lookup, concurrent fanout with
//!   an aggregate deadline, bookkeeping of every answer item.
//! - **`store`**: MongoDB and Redis (behind Sentinels) clients kept usable
//!   by a generic reconnecting watchdog.
//! - **`content`**: shared content types and the saved-content endpoints.
//! - **`auth`**: resolution of the `sid` cookie into a session.
//! - **`worker`**: the find endpoint and identity of a parser worker.
//! - **`config`**: environment configuration of both binaries.

pub mod auth;
pub mod config;
pub mod content;
pub mod discovery;
pub mod dispatcher;
pub mod store;
pub mod worker;

use tracing_subscriber::EnvFilter;

/// Logs at `INFO` unless `RUST_LOG` asks for something else.
pub fn init_tracing() {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => tracing_subscriber::fmt().with_env_filter(filter).init(),
        Err(_) => tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init(),
    }
}

/// Resolves once Ctrl+C is received.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
