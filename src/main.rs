//! Aptos trade-log relayer - HTTP backend
//!
//! Serves the dashboard API and logs trade actions on chain with the
//! configured wallet.

use anyhow::Result;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

use aptos_tradelog::api::{self, AppState};
use aptos_tradelog::logging::{init_logging, LogTarget};
use aptos_tradelog::metrics::{self, MetricsServer};
use aptos_tradelog::wallet::LocalAccount;
use aptos_tradelog::Settings;

const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging(LogTarget::Stdout);

    info!("Starting aptos-tradelog v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let settings = Settings::load()?;
    info!(
        "Loaded configuration for chain {} ({} node URL(s))",
        settings.chain.chain_id,
        settings.chain.node_urls.len()
    );

    // Signing key is required up front
    let account = LocalAccount::load(&settings.wallet)?;
    info!("Wallet address: {}", account.address());

    let state = AppState::from_settings(&settings, account)?;

    // Start API server
    let api_handle = tokio::spawn({
        let config = settings.api.clone();
        let state = state.clone();
        async move {
            if let Err(e) = api::run_server(&config, state).await {
                error!("API server error: {}", e);
            }
        }
    });

    // Start metrics server
    let metrics_handle = if settings.metrics.enabled {
        let server = MetricsServer::new(settings.metrics.port);
        Some(tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!("Metrics server error: {}", e);
            }
        }))
    } else {
        None
    };

    // Health check loop
    let health_handle = tokio::spawn({
        let chain = state.chain.clone();
        let chain_id = state.chain_id;
        async move {
            loop {
                let healthy = chain.health_check().await;
                metrics::record_chain_health(chain_id, healthy);
                if healthy {
                    metrics::record_health_check();
                } else {
                    warn!("Chain {} health check failed", chain_id);
                    metrics::record_health_check_failure();
                }

                tokio::time::sleep(HEALTH_CHECK_INTERVAL).await;
            }
        }
    });

    info!("aptos-tradelog is running");
    info!("API server: http://{}:{}", settings.api.host, settings.api.port);
    if settings.metrics.enabled {
        info!("Metrics: http://0.0.0.0:{}/metrics", settings.metrics.port);
    }

    // Wait for shutdown signal
    shutdown_signal().await;

    info!("Shutdown signal received, stopping...");

    // In-flight confirmation polls are dropped with their handlers
    api_handle.abort();
    health_handle.abort();
    if let Some(h) = metrics_handle {
        h.abort();
    }

    info!("aptos-tradelog stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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
