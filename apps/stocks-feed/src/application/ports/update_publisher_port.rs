//! Update Publisher Port (Driven Port)
//!
//! Fire-and-forget delivery of a price update to every subscriber of
//! the symbol's channel. Delivery to individual connections is the
//! transport's concern; the scheduler never retries a publish.

use crate::domain::price::{PriceUpdate, Symbol};

/// Port for fanning price updates out to subscribers.
pub trait UpdatePublisher: Send + Sync {
    /// Publish an update on its symbol's channel.
    ///
    /// Returns the number of receivers the update was delivered to;
    /// zero receivers is not an error.
    fn publish(&self, update: &PriceUpdate) -> usize;

    /// Symbols that currently have at least one live receiver.
    ///
    /// An open subscription is ongoing interest in a ticker even when
    /// its price never moves; the scheduler uses this to keep those
    /// tickers from aging out between deliveries.
    fn subscribed_symbols(&self) -> Vec<Symbol>;
}
