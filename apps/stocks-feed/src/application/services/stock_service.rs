//! Stock Lookup Service
//!
//! Read-through price lookup for the request path. Independent of the
//! scheduler: it consults the store first, falls back to a synchronous
//! upstream fetch-and-persist, and registers ongoing interest in the
//! ticker either way so the scheduler starts polling it.

use std::sync::Arc;

use chrono::Utc;
use metrics::counter;

use crate::application::ports::{PriceSource, PriceSourceError, PriceStore, PriceStoreError};
use crate::domain::price::{PriceRecord, normalize_symbol};
use crate::domain::ticker::ActiveTickerRegistry;

/// Stock lookup error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StockServiceError {
    /// The upstream fetch failed.
    #[error(transparent)]
    Source(#[from] PriceSourceError),

    /// The price store failed.
    #[error(transparent)]
    Store(#[from] PriceStoreError),
}

/// Read-through lookup over the store and the upstream source.
pub struct StockService {
    registry: Arc<ActiveTickerRegistry>,
    source: Arc<dyn PriceSource>,
    store: Arc<dyn PriceStore>,
}

impl StockService {
    /// Create a new lookup service.
    #[must_use]
    pub fn new(
        registry: Arc<ActiveTickerRegistry>,
        source: Arc<dyn PriceSource>,
        store: Arc<dyn PriceStore>,
    ) -> Self {
        Self {
            registry,
            source,
            store,
        }
    }

    /// Latest price for a ticker, or `None` when no data exists anywhere.
    ///
    /// Store hit: registers interest and returns the stored fact.
    /// Store miss: fetches upstream, persists the fact, seeds the
    /// registry's comparison baseline, and returns it.
    pub async fn latest_price(
        &self,
        ticker: &str,
    ) -> Result<Option<PriceRecord>, StockServiceError> {
        let symbol = normalize_symbol(ticker);
        counter!("stocks_feed_lookup_requests_total").increment(1);

        if let Some(record) = self.store.latest(&symbol).await? {
            self.registry.touch(&symbol);
            tracing::debug!(symbol = %symbol, price = %record.price, "Lookup served from store");
            return Ok(Some(record));
        }

        let price = match self.source.fetch(&symbol).await {
            Ok(price) => price,
            Err(PriceSourceError::NoData { .. }) => {
                tracing::warn!(symbol = %symbol, "No data available upstream");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let record = PriceRecord::new(symbol.clone(), price, Utc::now());
        self.store.append(&record).await?;

        // Seed the baseline so the scheduler's first pass over this
        // symbol compares against the price we just served.
        self.registry
            .observe_price(&symbol, price, record.timestamp);

        tracing::debug!(symbol = %symbol, price = %price, "Lookup served from upstream");
        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use rust_decimal::Decimal;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    struct FixedSource {
        result: Result<Decimal, PriceSourceError>,
        fetches: AtomicUsize,
    }

    impl FixedSource {
        fn ok(price: Decimal) -> Self {
            Self {
                result: Ok(price),
                fetches: AtomicUsize::new(0),
            }
        }

        fn no_data() -> Self {
            Self {
                result: Err(PriceSourceError::NoData {
                    symbol: "ANY".to_string(),
                }),
                fetches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PriceSource for FixedSource {
        async fn fetch(&self, _symbol: &str) -> Result<Decimal, PriceSourceError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    #[derive(Default)]
    struct MemStore {
        records: Mutex<Vec<PriceRecord>>,
    }

    #[async_trait]
    impl PriceStore for MemStore {
        async fn append(&self, record: &PriceRecord) -> Result<(), PriceStoreError> {
            self.records.lock().push(record.clone());
            Ok(())
        }

        async fn latest(&self, symbol: &str) -> Result<Option<PriceRecord>, PriceStoreError> {
            Ok(self
                .records
                .lock()
                .iter()
                .rev()
                .find(|r| r.symbol == symbol)
                .cloned())
        }
    }

    #[tokio::test]
    async fn store_hit_touches_registry_and_skips_upstream() {
        let registry = Arc::new(ActiveTickerRegistry::new());
        let source = Arc::new(FixedSource::ok(dec("999")));
        let store = Arc::new(MemStore::default());
        store
            .append(&PriceRecord::new("AAPL", dec("150"), Utc::now()))
            .await
            .unwrap();

        let service = StockService::new(
            Arc::clone(&registry),
            Arc::clone(&source) as Arc<dyn PriceSource>,
            Arc::clone(&store) as Arc<dyn PriceStore>,
        );

        let record = service.latest_price("aapl").await.unwrap().unwrap();

        assert_eq!(record.price, dec("150"));
        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
        assert_eq!(registry.len(), 1);
        // A touch alone does not seed a price baseline.
        assert!(registry.last_known_price("AAPL").is_none());
    }

    #[tokio::test]
    async fn store_miss_fetches_persists_and_seeds_baseline() {
        let registry = Arc::new(ActiveTickerRegistry::new());
        let source = Arc::new(FixedSource::ok(dec("150.25")));
        let store = Arc::new(MemStore::default());

        let service = StockService::new(
            Arc::clone(&registry),
            Arc::clone(&source) as Arc<dyn PriceSource>,
            Arc::clone(&store) as Arc<dyn PriceStore>,
        );

        let record = service.latest_price("aapl").await.unwrap().unwrap();

        assert_eq!(record.symbol, "AAPL");
        assert_eq!(record.price, dec("150.25"));
        assert_eq!(store.records.lock().len(), 1);
        assert_eq!(registry.last_known_price("AAPL"), Some(dec("150.25")));
    }

    #[tokio::test]
    async fn upstream_no_data_yields_none() {
        let registry = Arc::new(ActiveTickerRegistry::new());
        let source = Arc::new(FixedSource::no_data());
        let store = Arc::new(MemStore::default());

        let service = StockService::new(
            registry,
            source as Arc<dyn PriceSource>,
            Arc::clone(&store) as Arc<dyn PriceStore>,
        );

        let result = service.latest_price("NOPE").await.unwrap();

        assert!(result.is_none());
        assert!(store.records.lock().is_empty());
    }

    #[tokio::test]
    async fn upstream_failure_propagates() {
        let registry = Arc::new(ActiveTickerRegistry::new());
        let source = Arc::new(FixedSource {
            result: Err(PriceSourceError::Upstream {
                message: "503".to_string(),
            }),
            fetches: AtomicUsize::new(0),
        });
        let store = Arc::new(MemStore::default());

        let service = StockService::new(
            registry,
            source as Arc<dyn PriceSource>,
            store as Arc<dyn PriceStore>,
        );

        let result = service.latest_price("AAPL").await;

        assert!(matches!(result, Err(StockServiceError::Source(_))));
    }
}
