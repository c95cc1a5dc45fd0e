//! Price Feed Hub
//!
//! Implements update fan-out using tokio broadcast channels, one
//! channel per ticker symbol. Channel identity is the uppercased
//! symbol; multiple receivers per channel are supported with a
//! configurable capacity.
//!
//! The hub owns the channel-keyed subscriber registry; the scheduler
//! only sees the narrow `UpdatePublisher` capability and never learns
//! which individual connections exist.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::application::ports::UpdatePublisher;
use crate::domain::price::{PriceUpdate, Symbol, normalize_symbol};

/// Default per-channel capacity.
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Central hub for per-symbol price update channels.
///
/// # Example
///
/// ```rust
/// use stocks_feed::infrastructure::broadcast::PriceFeedHub;
///
/// let hub = PriceFeedHub::with_defaults();
///
/// // A client subscribes to AAPL updates
/// let mut rx = hub.subscribe("AAPL");
///
/// // Elsewhere, the scheduler publishes
/// // hub.publish(&update);
/// ```
#[derive(Debug)]
pub struct PriceFeedHub {
    capacity: usize,
    channels: RwLock<HashMap<Symbol, broadcast::Sender<PriceUpdate>>>,
}

impl PriceFeedHub {
    /// Create a new hub with the given per-channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Create a new hub with the default capacity.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Get a new receiver for a symbol's channel, creating the channel
    /// on first subscription.
    #[must_use]
    pub fn subscribe(&self, symbol: &str) -> broadcast::Receiver<PriceUpdate> {
        let symbol = normalize_symbol(symbol);

        if let Some(tx) = self.channels.read().get(&symbol) {
            return tx.subscribe();
        }

        let mut channels = self.channels.write();
        channels
            .entry(symbol)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Publish an update to its symbol's channel.
    ///
    /// Returns the number of receivers that got the message. Zero when
    /// the channel does not exist or has no receivers; publishing is
    /// fire-and-forget either way.
    pub fn publish(&self, update: &PriceUpdate) -> usize {
        let channels = self.channels.read();
        channels
            .get(&update.symbol)
            .map_or(0, |tx| tx.send(update.clone()).unwrap_or(0))
    }

    /// Drop channels that no longer have any receivers.
    ///
    /// Called opportunistically by the transport when connections close
    /// so the map does not accumulate channels for symbols nobody
    /// watches anymore. Returns the number of channels removed.
    pub fn prune_idle(&self) -> usize {
        let mut channels = self.channels.write();
        let before = channels.len();
        channels.retain(|_, tx| tx.receiver_count() > 0);
        before - channels.len()
    }

    /// Symbols whose channels currently have at least one receiver.
    #[must_use]
    pub fn subscribed_symbols(&self) -> Vec<Symbol> {
        self.channels
            .read()
            .iter()
            .filter(|(_, tx)| tx.receiver_count() > 0)
            .map(|(symbol, _)| symbol.clone())
            .collect()
    }

    /// Number of active receivers on a symbol's channel.
    #[must_use]
    pub fn receiver_count(&self, symbol: &str) -> usize {
        let symbol = normalize_symbol(symbol);
        self.channels
            .read()
            .get(&symbol)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Current hub statistics.
    #[must_use]
    pub fn stats(&self) -> FeedHubStats {
        let channels = self.channels.read();
        FeedHubStats {
            channels: channels.len(),
            receivers: channels.values().map(broadcast::Sender::receiver_count).sum(),
        }
    }
}

impl UpdatePublisher for PriceFeedHub {
    fn publish(&self, update: &PriceUpdate) -> usize {
        Self::publish(self, update)
    }

    fn subscribed_symbols(&self) -> Vec<Symbol> {
        Self::subscribed_symbols(self)
    }
}

/// Shared feed hub reference.
pub type SharedPriceFeedHub = Arc<PriceFeedHub>;

/// Statistics about the hub's channels.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedHubStats {
    /// Number of symbol channels.
    pub channels: usize,
    /// Total receivers across all channels.
    pub receivers: usize,
}
