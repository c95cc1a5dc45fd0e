//! Price Value Types
//!
//! Shared types for observed prices: the message published to feed
//! subscribers, the persisted price fact, and the relative-change math
//! that decides whether a move is worth announcing.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A symbol string (normalized, uppercase ticker).
pub type Symbol = String;

/// Normalize a raw ticker to its canonical uppercase form.
///
/// Symbol identity is case-insensitive; every entry point normalizes
/// before touching shared state so `aapl` and `AAPL` are one ticker.
#[must_use]
pub fn normalize_symbol(raw: &str) -> Symbol {
    raw.trim().to_uppercase()
}

/// A price update published to feed subscribers.
///
/// Immutable once created; produced by the update scheduler when a
/// significant change is detected and delivered on the symbol's channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceUpdate {
    /// Normalized ticker symbol.
    pub symbol: Symbol,
    /// The newly observed price.
    pub price: Decimal,
    /// When the price was observed by this process.
    pub observed_at: DateTime<Utc>,
}

impl PriceUpdate {
    /// Create a new price update.
    #[must_use]
    pub fn new(symbol: impl Into<Symbol>, price: Decimal, observed_at: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            observed_at,
        }
    }
}

/// A persisted price fact.
///
/// Append-only: the core only ever appends facts and reads the most
/// recent one per symbol, never mutates or deletes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRecord {
    /// Normalized ticker symbol.
    pub symbol: Symbol,
    /// The recorded price.
    pub price: Decimal,
    /// When the price was recorded.
    pub timestamp: DateTime<Utc>,
}

impl PriceRecord {
    /// Create a new price record.
    #[must_use]
    pub fn new(symbol: impl Into<Symbol>, price: Decimal, timestamp: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            timestamp,
        }
    }
}

/// Relative change between a previous and a current price.
///
/// Returns `|current - previous| / previous`, or `None` when the
/// previous price is zero and the ratio is undefined. Callers treat a
/// zero-to-nonzero move as significant.
#[must_use]
pub fn relative_change(previous: Decimal, current: Decimal) -> Option<Decimal> {
    if previous.is_zero() {
        return None;
    }
    Some(((current - previous) / previous).abs())
}
