//! Price Store Port (Driven Port)
//!
//! Append-only persistence of price facts. The core appends one fact
//! per significant observation and reads back the most recent fact per
//! symbol; it never mutates or deletes rows.

use async_trait::async_trait;

use crate::domain::price::PriceRecord;

/// Price store error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PriceStoreError {
    /// The store is unavailable or the operation failed.
    #[error("price store unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },
}

/// Port for persisting and reading price facts.
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Append one price fact.
    async fn append(&self, record: &PriceRecord) -> Result<(), PriceStoreError>;

    /// Most recent fact for a normalized symbol, if any exists.
    async fn latest(&self, symbol: &str) -> Result<Option<PriceRecord>, PriceStoreError>;
}
