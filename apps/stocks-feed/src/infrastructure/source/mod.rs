//! Upstream Quote Provider Client
//!
//! `PriceSource` adapter for the Alpha Vantage intraday API. The
//! provider is heavily rate limited, so responses are cached in-process
//! with a short TTL: bursts of repeated requests for the same symbol
//! within one update interval are absorbed here and never reach the
//! network.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::application::ports::{PriceSource, PriceSourceError};
use crate::domain::price::{Symbol, normalize_symbol};

/// Alpha Vantage client settings.
#[derive(Clone)]
pub struct AlphaVantageConfig {
    /// Base URL of the quote API.
    pub api_url: String,
    /// API key sent with every request.
    pub api_key: String,
    /// How long a fetched price stays served from cache.
    pub cache_ttl: Duration,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl std::fmt::Debug for AlphaVantageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlphaVantageConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"[REDACTED]")
            .field("cache_ttl", &self.cache_ttl)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedPrice {
    price: Decimal,
    fetched_at: Instant,
}

/// HTTP client for the Alpha Vantage intraday endpoint.
#[derive(Debug)]
pub struct AlphaVantageClient {
    client: Client,
    config: AlphaVantageConfig,
    cache: RwLock<HashMap<Symbol, CachedPrice>>,
}

impl AlphaVantageClient {
    /// Create a new client from config.
    pub fn new(config: AlphaVantageConfig) -> Result<Self, PriceSourceError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PriceSourceError::Upstream {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            config,
            cache: RwLock::new(HashMap::new()),
        })
    }

    fn cached(&self, symbol: &str) -> Option<Decimal> {
        let cache = self.cache.read();
        cache.get(symbol).and_then(|entry| {
            (entry.fetched_at.elapsed() < self.config.cache_ttl).then_some(entry.price)
        })
    }

    async fn fetch_upstream(&self, symbol: &str) -> Result<Decimal, PriceSourceError> {
        let response = self
            .client
            .get(&self.config.api_url)
            .query(&[
                ("function", "TIME_SERIES_INTRADAY"),
                ("symbol", symbol),
                ("interval", "15min"),
                ("apikey", &self.config.api_key),
            ])
            .send()
            .await
            .map_err(|e| PriceSourceError::Upstream {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PriceSourceError::Upstream {
                message: format!("upstream returned {status}"),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| PriceSourceError::Upstream {
                message: e.to_string(),
            })?;

        parse_intraday(symbol, &body)
    }
}

#[async_trait]
impl PriceSource for AlphaVantageClient {
    async fn fetch(&self, symbol: &str) -> Result<Decimal, PriceSourceError> {
        let symbol = normalize_symbol(symbol);

        if let Some(price) = self.cached(&symbol) {
            tracing::trace!(symbol = %symbol, "Price served from source cache");
            return Ok(price);
        }

        tracing::debug!(symbol = %symbol, "Fetching price from upstream");
        let price = self.fetch_upstream(&symbol).await?;

        self.cache.write().insert(
            symbol,
            CachedPrice {
                price,
                fetched_at: Instant::now(),
            },
        );

        Ok(price)
    }
}

// =============================================================================
// Response Parsing
// =============================================================================

#[derive(Debug, Deserialize)]
struct IntradayResponse {
    // Keys are "YYYY-MM-DD HH:MM:SS" timestamps; a BTreeMap sorts them
    // so the last entry is the most recent bar.
    #[serde(rename = "Time Series (15min)")]
    time_series: Option<BTreeMap<String, IntradayBar>>,
}

#[derive(Debug, Deserialize)]
struct IntradayBar {
    #[serde(rename = "2. high")]
    high: String,
}

/// Extract the most recent bar's high price from an intraday response.
///
/// An absent or empty time series (the provider's shape for unknown
/// symbols and exceeded rate limits) maps to `NoData`.
fn parse_intraday(symbol: &str, body: &str) -> Result<Decimal, PriceSourceError> {
    let response: IntradayResponse =
        serde_json::from_str(body).map_err(|e| PriceSourceError::MalformedResponse {
            message: e.to_string(),
        })?;

    let Some(series) = response.time_series.filter(|s| !s.is_empty()) else {
        return Err(PriceSourceError::NoData {
            symbol: symbol.to_string(),
        });
    };

    let (_, latest) = series
        .iter()
        .next_back()
        .ok_or_else(|| PriceSourceError::NoData {
            symbol: symbol.to_string(),
        })?;

    Decimal::from_str(&latest.high).map_err(|e| PriceSourceError::MalformedResponse {
        message: format!("invalid price '{}': {e}", latest.high),
    })
}
