//! Price Fact Persistence
//!
//! Adapters for the `PriceStore` port. The service treats storage as an
//! external collaborator; this in-memory adapter keeps the append-only
//! fact log per symbol and serves the most recent fact, which is all
//! the core ever reads.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::application::ports::{PriceStore, PriceStoreError};
use crate::domain::price::{PriceRecord, Symbol, normalize_symbol};

/// In-memory implementation of `PriceStore`.
///
/// Facts are appended per symbol and never mutated or deleted.
#[derive(Debug, Default)]
pub struct InMemoryPriceStore {
    facts: RwLock<HashMap<Symbol, Vec<PriceRecord>>>,
}

impl InMemoryPriceStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            facts: RwLock::new(HashMap::new()),
        }
    }

    /// Total number of facts across all symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.facts.read().values().map(Vec::len).sum()
    }

    /// Whether the store holds no facts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facts.read().values().all(Vec::is_empty)
    }
}

#[async_trait]
impl PriceStore for InMemoryPriceStore {
    async fn append(&self, record: &PriceRecord) -> Result<(), PriceStoreError> {
        let symbol = normalize_symbol(&record.symbol);
        let mut facts = self.facts.write();
        facts.entry(symbol).or_default().push(record.clone());
        Ok(())
    }

    async fn latest(&self, symbol: &str) -> Result<Option<PriceRecord>, PriceStoreError> {
        let symbol = normalize_symbol(symbol);
        let facts = self.facts.read();
        Ok(facts
            .get(&symbol)
            .and_then(|rows| rows.iter().max_by_key(|r| r.timestamp))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn latest_on_empty_store_is_none() {
        let store = InMemoryPriceStore::new();
        assert!(store.latest("AAPL").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn latest_returns_most_recent_fact() {
        let store = InMemoryPriceStore::new();
        let earlier = Utc::now() - chrono::Duration::seconds(60);

        store
            .append(&PriceRecord::new("AAPL", dec("149"), earlier))
            .await
            .unwrap();
        store
            .append(&PriceRecord::new("AAPL", dec("150"), Utc::now()))
            .await
            .unwrap();

        let latest = store.latest("AAPL").await.unwrap().unwrap();
        assert_eq!(latest.price, dec("150"));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn symbols_are_case_insensitive() {
        let store = InMemoryPriceStore::new();
        store
            .append(&PriceRecord::new("AAPL", dec("150"), Utc::now()))
            .await
            .unwrap();

        assert!(store.latest("aapl").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn facts_are_isolated_per_symbol() {
        let store = InMemoryPriceStore::new();
        store
            .append(&PriceRecord::new("AAPL", dec("150"), Utc::now()))
            .await
            .unwrap();

        assert!(store.latest("MSFT").await.unwrap().is_none());
    }
}
