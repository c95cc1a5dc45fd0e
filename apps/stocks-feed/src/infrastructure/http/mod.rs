//! HTTP API, WebSocket Feed, and Health Endpoints
//!
//! Single axum server exposing the service's outer surface.
//!
//! # Endpoints
//!
//! - `GET /api/stocks/{ticker}` - Latest price for a ticker
//! - `GET /stocks-feed` - WebSocket price feed (subscribe/unsubscribe)
//! - `GET /health` - Returns JSON health status
//! - `GET /healthz` - Kubernetes liveness probe (simple OK)
//! - `GET /readyz` - Kubernetes readiness probe
//! - `GET /metrics` - Prometheus metrics in text format
//!
//! # WebSocket Protocol
//!
//! Clients send JSON commands and receive JSON price updates:
//!
//! ```json
//! { "action": "subscribe", "ticker": "AAPL" }
//! { "action": "unsubscribe", "ticker": "AAPL" }
//! ```
//!
//! Each subscribed symbol's updates arrive as they are broadcast. A
//! subscription also registers the ticker with the update scheduler, so
//! watching a symbol is what causes it to be polled.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{StreamExt, StreamMap};
use tokio_util::sync::CancellationToken;

use crate::application::services::{StockService, StockServiceError};
use crate::domain::price::{PriceRecord, Symbol, normalize_symbol};
use crate::domain::ticker::ActiveTickerRegistry;
use crate::infrastructure::broadcast::SharedPriceFeedHub;
use crate::infrastructure::metrics::get_metrics_handle;

// =============================================================================
// Server State
// =============================================================================

/// Shared state for the API server.
pub struct ApiServerState {
    version: String,
    started_at: Instant,
    service: Arc<StockService>,
    registry: Arc<ActiveTickerRegistry>,
    hub: SharedPriceFeedHub,
}

impl ApiServerState {
    /// Create new API server state.
    #[must_use]
    pub fn new(
        version: String,
        service: Arc<StockService>,
        registry: Arc<ActiveTickerRegistry>,
        hub: SharedPriceFeedHub,
    ) -> Self {
        Self {
            version,
            started_at: Instant::now(),
            service,
            registry,
            hub,
        }
    }
}

// =============================================================================
// API Server
// =============================================================================

/// HTTP server for the REST API, WebSocket feed, and health endpoints.
pub struct ApiServer {
    port: u16,
    state: Arc<ApiServerState>,
    cancel: CancellationToken,
}

impl ApiServer {
    /// Create a new API server.
    #[must_use]
    pub const fn new(port: u16, state: Arc<ApiServerState>, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Run the API server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `ApiServerError` if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), ApiServerError> {
        let app = router(self.state);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ApiServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| ApiServerError::ServerFailed(e.to_string()))?;

        tracing::info!("API server stopped");
        Ok(())
    }
}

/// Build the API router.
#[must_use]
pub fn router(state: Arc<ApiServerState>) -> Router {
    Router::new()
        .route("/api/stocks/{ticker}", get(stock_handler))
        .route("/stocks-feed", get(feed_handler))
        .route("/health", get(health_handler))
        .route("/healthz", get(liveness_handler))
        .route("/readyz", get(readiness_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

// =============================================================================
// REST Handlers
// =============================================================================

/// Price response for the REST lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockPriceResponse {
    /// Ticker symbol, uppercased.
    pub ticker: Symbol,
    /// Latest known price.
    pub price: rust_decimal::Decimal,
    /// When the price was observed.
    pub timestamp: DateTime<Utc>,
}

impl From<PriceRecord> for StockPriceResponse {
    fn from(record: PriceRecord) -> Self {
        Self {
            ticker: record.symbol,
            price: record.price,
            timestamp: record.timestamp,
        }
    }
}

async fn stock_handler(
    State(state): State<Arc<ApiServerState>>,
    Path(ticker): Path<String>,
) -> Response {
    match state.service.latest_price(&ticker).await {
        Ok(Some(record)) => (StatusCode::OK, Json(StockPriceResponse::from(record))).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            format!(
                "No stock data available for ticker: {}",
                normalize_symbol(&ticker)
            ),
        )
            .into_response(),
        Err(StockServiceError::Source(e)) => {
            tracing::warn!(ticker = %ticker, error = %e, "Upstream fetch failed during lookup");
            (StatusCode::BAD_GATEWAY, "Upstream price source unavailable").into_response()
        }
        Err(StockServiceError::Store(e)) => {
            tracing::error!(ticker = %ticker, error = %e, "Price store failed during lookup");
            (StatusCode::INTERNAL_SERVER_ERROR, "Price store unavailable").into_response()
        }
    }
}

// =============================================================================
// WebSocket Feed
// =============================================================================

/// Commands clients send over the feed socket.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum FeedCommand {
    /// Start receiving updates for a ticker.
    Subscribe {
        /// Ticker symbol.
        ticker: String,
    },
    /// Stop receiving updates for a ticker.
    Unsubscribe {
        /// Ticker symbol.
        ticker: String,
    },
}

async fn feed_handler(
    State(state): State<Arc<ApiServerState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| feed_connection(socket, state))
}

async fn feed_connection(mut socket: WebSocket, state: Arc<ApiServerState>) {
    let mut streams: StreamMap<Symbol, BroadcastStream<crate::domain::price::PriceUpdate>> =
        StreamMap::new();

    tracing::debug!("Feed connection opened");

    loop {
        tokio::select! {
            message = socket.recv() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        handle_feed_command(text.as_str(), &state, &mut streams);
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(error = %e, "Feed connection error");
                        break;
                    }
                }
            }
            // The guard keeps an empty StreamMap (which yields None
            // immediately) from spinning this loop.
            Some((symbol, result)) = streams.next(), if !streams.is_empty() => {
                let Ok(update) = result else {
                    // Lagged receiver; missed updates are dropped and
                    // the stream continues from the current position.
                    continue;
                };

                state.registry.touch(&symbol);

                match serde_json::to_string(&update) {
                    Ok(payload) => {
                        if socket.send(Message::Text(payload.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!(symbol = %symbol, error = %e, "Failed to serialize update");
                    }
                }
            }
        }
    }

    drop(streams);
    let pruned = state.hub.prune_idle();
    tracing::debug!(pruned_channels = pruned, "Feed connection closed");
}

fn handle_feed_command(
    text: &str,
    state: &ApiServerState,
    streams: &mut StreamMap<Symbol, BroadcastStream<crate::domain::price::PriceUpdate>>,
) {
    let command: FeedCommand = match serde_json::from_str(text) {
        Ok(command) => command,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring malformed feed command");
            return;
        }
    };

    match command {
        FeedCommand::Subscribe { ticker } => {
            let symbol = normalize_symbol(&ticker);
            if symbol.is_empty() || streams.contains_key(&symbol) {
                return;
            }

            let receiver = state.hub.subscribe(&symbol);
            state.registry.touch(&symbol);
            streams.insert(symbol.clone(), BroadcastStream::new(receiver));
            tracing::debug!(symbol = %symbol, "Client subscribed");
        }
        FeedCommand::Unsubscribe { ticker } => {
            let symbol = normalize_symbol(&ticker);
            if streams.remove(&symbol).is_some() {
                tracing::debug!(symbol = %symbol, "Client unsubscribed");
            }
        }
    }
}

// =============================================================================
// Health Handlers
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: HealthStatus,
    /// Service version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Number of tickers tracked for updates.
    pub tracked_tickers: usize,
    /// Feed subscription statistics.
    pub feed: FeedStatus,
}

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// All systems operational.
    Healthy,
}

/// Feed subscription statistics.
#[derive(Debug, Clone, Serialize)]
pub struct FeedStatus {
    /// Number of symbol channels.
    pub channels: usize,
    /// Total receivers across all channels.
    pub receivers: usize,
}

async fn health_handler(State(state): State<Arc<ApiServerState>>) -> impl IntoResponse {
    let stats = state.hub.stats();
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        current_time: Utc::now(),
        tracked_tickers: state.registry.len(),
        feed: FeedStatus {
            channels: stats.channels,
            receivers: stats.receivers,
        },
    };

    (StatusCode::OK, Json(response))
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn readiness_handler() -> impl IntoResponse {
    (StatusCode::OK, "READY")
}

async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            let body = handle.render();
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                body,
            )
        },
    )
}

// =============================================================================
// Errors
// =============================================================================

/// API server errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

// =============================================================================
// Tests
// =============================================================================
