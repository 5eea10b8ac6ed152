//! # UniConnect server
//!
//! Loads configuration, installs tracing, wires the in-memory stores into the
//! services and serves the HTTP API until SIGINT or SIGTERM.

use std::sync::Arc;

use anyhow::{Context, Result};
use api_adapters::{router, AppState, Metrics};
use configs::{AppConfig, LogConfig, LogFormat};
use domains::{ListingRepository, MessageRepository};
use services::{ContentModerator, DiscoverySettings, ListingService, MessageService};
use storage_adapters::{InMemoryListingRepository, InMemoryMessageRepository};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.log);

    // 1. Stores
    let listing_repo: Arc<dyn ListingRepository> = Arc::new(InMemoryListingRepository::new());
    let message_repo: Arc<dyn MessageRepository> = Arc::new(InMemoryMessageRepository::new());

    // 2. Services
    let moderator = Arc::new(
        ContentModerator::default().with_custom_keywords(config.moderation.custom_keywords.clone()),
    );
    let settings = DiscoverySettings {
        default_radius_km: config.discovery.default_radius_km,
        default_page_size: config.discovery.default_page_size,
        max_page_size: config.discovery.max_page_size,
    };
    let state = AppState {
        listings: Arc::new(ListingService::new(listing_repo.clone(), moderator.clone(), settings)),
        messages: Arc::new(MessageService::new(message_repo, listing_repo, moderator.clone())),
        moderator,
        metrics: Arc::new(Metrics::new()),
    };

    // 3. Serve
    let address = config.server.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!(%address, "UniConnect listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("UniConnect stopped");
    Ok(())
}

/// `RUST_LOG` wins over the configured filter.
fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match log.format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Pretty => subscriber.init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
