//! Price Source Port (Driven Port)
//!
//! Interface for fetching the latest price of a single ticker from the
//! upstream quote provider. Adapters are expected to carry their own
//! short-TTL response cache so bursts of repeated requests within one
//! update interval never hit the rate-limited upstream.

use async_trait::async_trait;
use rust_decimal::Decimal;

/// Price source error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PriceSourceError {
    /// The upstream provider was unreachable or returned a failure.
    #[error("upstream request failed: {message}")]
    Upstream {
        /// Error details.
        message: String,
    },

    /// The upstream response could not be parsed.
    #[error("malformed upstream response: {message}")]
    MalformedResponse {
        /// Error details.
        message: String,
    },

    /// The provider has no price data for the symbol.
    #[error("no price data available for {symbol}")]
    NoData {
        /// The symbol without data.
        symbol: String,
    },
}

/// Port for fetching upstream prices.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch the latest known price for a normalized symbol.
    async fn fetch(&self, symbol: &str) -> Result<Decimal, PriceSourceError>;
}
