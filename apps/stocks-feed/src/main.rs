//! Stocks Feed Binary
//!
//! Starts the near-real-time stock price feed service.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin stocks-feed
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOCKS_API_URL`: Quote provider base URL
//! - `STOCKS_API_KEY`: Quote provider API key
//!
//! ## Optional
//! - `STOCKS_HTTP_PORT`: API server port (default: 8080)
//! - `STOCKS_UPDATE_INTERVAL_SECS`: Scheduler tick cadence (default: 5)
//! - `STOCKS_MAX_PERCENTAGE_CHANGE`: Broadcast threshold (default: 0.02)
//! - `STOCKS_IDLE_EVICTION_SECS`: Idle ticker eviction (default: 300)
//! - `STOCKS_FETCH_CONCURRENCY`: Concurrent fetches per tick (default: 8)
//! - `STOCKS_SOURCE_CACHE_TTL_SECS`: Source cache TTL (default: 300)
//! - `STOCKS_SOURCE_TIMEOUT_SECS`: Upstream request timeout (default: 10)
//! - `STOCKS_FEED_CHANNEL_CAPACITY`: Per-symbol channel size (default: 256)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use stocks_feed::application::services::{SchedulerConfig, StockService, UpdateScheduler};
use stocks_feed::domain::ticker::ActiveTickerRegistry;
use stocks_feed::infrastructure::broadcast::PriceFeedHub;
use stocks_feed::infrastructure::http::{ApiServer, ApiServerState};
use stocks_feed::infrastructure::persistence::InMemoryPriceStore;
use stocks_feed::infrastructure::source::{AlphaVantageClient, AlphaVantageConfig};
use stocks_feed::infrastructure::telemetry;
use stocks_feed::{FeedConfig, PriceSource, PriceStore, UpdatePublisher, init_metrics};
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_dotenv();

    telemetry::init();

    tracing::info!("Starting stocks feed service");

    let _metrics_handle = init_metrics();

    let config = FeedConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    // Core state
    let registry = Arc::new(ActiveTickerRegistry::new());
    let hub = Arc::new(PriceFeedHub::new(config.broadcast.channel_capacity));
    let store: Arc<dyn PriceStore> = Arc::new(InMemoryPriceStore::new());

    let source: Arc<dyn PriceSource> = Arc::new(AlphaVantageClient::new(AlphaVantageConfig {
        api_url: config.source.api_url.clone(),
        api_key: config.source.api_key.clone(),
        cache_ttl: config.source.cache_ttl,
        timeout: config.source.request_timeout,
    })?);

    // Lookup service for the REST path
    let service = Arc::new(StockService::new(
        Arc::clone(&registry),
        Arc::clone(&source),
        Arc::clone(&store),
    ));

    // Update scheduler
    let scheduler = UpdateScheduler::new(
        SchedulerConfig {
            update_interval: config.update.update_interval,
            max_percentage_change: config.update.max_percentage_change,
            idle_eviction_threshold: config.update.idle_eviction_threshold,
            fetch_concurrency: config.update.fetch_concurrency,
        },
        Arc::clone(&registry),
        Arc::clone(&source),
        Arc::clone(&store),
        Arc::clone(&hub) as Arc<dyn UpdatePublisher>,
        shutdown_token.clone(),
    );

    let scheduler_handle = tokio::spawn(scheduler.run());

    // API server
    let api_state = Arc::new(ApiServerState::new(
        env!("CARGO_PKG_VERSION").to_string(),
        service,
        Arc::clone(&registry),
        Arc::clone(&hub),
    ));
    let api_server = ApiServer::new(config.server.http_port, api_state, shutdown_token.clone());

    let api_handle = tokio::spawn(async move {
        if let Err(e) = api_server.run().await {
            tracing::error!(error = %e, "API server error");
        }
    });

    tracing::info!("Stocks feed ready");

    await_shutdown(shutdown_token).await;

    // Bounded wait for the scheduler and server to wind down.
    let shutdown = async {
        let _ = scheduler_handle.await;
        let _ = api_handle.await;
    };
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, shutdown).await.is_err() {
        tracing::warn!("Shutdown timed out, exiting anyway");
    }

    tracing::info!("Stocks feed stopped");
    Ok(())
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &FeedConfig) {
    tracing::info!(
        http_port = config.server.http_port,
        update_interval_secs = config.update.update_interval.as_secs(),
        threshold = %config.update.max_percentage_change,
        idle_eviction_secs = config.update.idle_eviction_threshold.as_secs(),
        fetch_concurrency = config.update.fetch_concurrency,
        "Configuration loaded"
    );
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
