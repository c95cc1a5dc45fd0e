//! Update Scheduler
//!
//! The recurring process behind the feed: once per interval it evicts
//! idle tickers, snapshots the registry, fetches a fresh price per
//! tracked symbol, and persists and publishes the changes that clear
//! the significance threshold.
//!
//! # Tick semantics
//!
//! Per-symbol work within a tick is independent and runs concurrently,
//! bounded by a fetch-concurrency cap so a large watch list never
//! floods the upstream provider. The tick is a synchronization point:
//! the next tick does not start until every symbol's outcome has been
//! resolved, so concurrent upstream calls stay bounded even when the
//! provider is slow.
//!
//! No failure inside a tick is fatal. A fetch failure skips that
//! symbol; a persistence failure still updates the in-memory baseline
//! (so the next comparison stays correct) but skips the publish, since
//! announcing an unpersisted change would make the store lie.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::StreamExt;
use metrics::{counter, gauge, histogram};
use rust_decimal::Decimal;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{PriceSource, PriceStore, UpdatePublisher};
use crate::domain::price::{PriceRecord, PriceUpdate, relative_change};
use crate::domain::ticker::{ActiveTickerRegistry, TickerSnapshot};

/// Scheduler timing and significance settings.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Tick cadence.
    pub update_interval: Duration,
    /// Relative change at or above which a move is significant.
    pub max_percentage_change: Decimal,
    /// How long an untouched ticker remains tracked.
    pub idle_eviction_threshold: Duration,
    /// Maximum concurrent upstream fetches within one tick.
    pub fetch_concurrency: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            update_interval: Duration::from_secs(5),
            max_percentage_change: Decimal::new(2, 2), // 2%
            idle_eviction_threshold: Duration::from_secs(300),
            fetch_concurrency: 8,
        }
    }
}

/// Drives the periodic fetch-compare-persist-publish cycle.
pub struct UpdateScheduler {
    config: SchedulerConfig,
    registry: Arc<ActiveTickerRegistry>,
    source: Arc<dyn PriceSource>,
    store: Arc<dyn PriceStore>,
    publisher: Arc<dyn UpdatePublisher>,
    cancel: CancellationToken,
}

impl UpdateScheduler {
    /// Create a new scheduler over the given collaborators.
    #[must_use]
    pub fn new(
        config: SchedulerConfig,
        registry: Arc<ActiveTickerRegistry>,
        source: Arc<dyn PriceSource>,
        store: Arc<dyn PriceStore>,
        publisher: Arc<dyn UpdatePublisher>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            registry,
            source,
            store,
            publisher,
            cancel,
        }
    }

    /// Run the recurring tick loop until cancelled.
    ///
    /// An in-flight tick is abandoned cooperatively on cancellation
    /// rather than blocking shutdown; no partial tick is retried.
    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.config.update_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = self.config.update_interval.as_secs(),
            threshold = %self.config.max_percentage_change,
            "Update scheduler started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    tokio::select! {
                        () = self.run_tick() => {}
                        () = self.cancel.cancelled() => {
                            tracing::info!("Tick abandoned during shutdown");
                            break;
                        }
                    }
                }
                () = self.cancel.cancelled() => break,
            }
        }

        tracing::info!("Update scheduler stopped");
    }

    /// Run a single fetch-compare-persist-publish cycle.
    ///
    /// Exposed so tests and operational tooling can drive ticks without
    /// the interval clock.
    pub async fn run_tick(&self) {
        let started = Instant::now();

        // An open subscription is ongoing interest even when the price
        // never clears the threshold, so subscribed symbols are kept
        // alive before the idle sweep runs.
        for symbol in self.publisher.subscribed_symbols() {
            self.registry.touch(&symbol);
        }

        let evicted = self
            .registry
            .evict_stale(self.config.idle_eviction_threshold, Utc::now());
        if evicted > 0 {
            counter!("stocks_feed_evicted_tickers_total").increment(evicted as u64);
            tracing::debug!(evicted, "Evicted idle tickers");
        }

        let snapshot = self.registry.snapshot();
        gauge!("stocks_feed_active_tickers").set(snapshot.len() as f64);

        if !snapshot.is_empty() {
            futures::stream::iter(snapshot)
                .for_each_concurrent(self.config.fetch_concurrency, |entry| {
                    self.process_symbol(entry)
                })
                .await;
        }

        counter!("stocks_feed_ticks_total").increment(1);
        histogram!("stocks_feed_tick_duration_seconds").record(started.elapsed().as_secs_f64());
    }

    /// Resolve one symbol's outcome for this tick.
    async fn process_symbol(&self, entry: TickerSnapshot) {
        let price = match self.source.fetch(&entry.symbol).await {
            Ok(price) => price,
            Err(e) => {
                counter!("stocks_feed_fetch_failures_total").increment(1);
                tracing::warn!(
                    symbol = %entry.symbol,
                    error = %e,
                    "Price fetch failed, skipping symbol this tick"
                );
                return;
            }
        };
        let observed_at = Utc::now();

        let Some(previous) = entry.last_known_price else {
            // First sight of this symbol: record the baseline but never
            // announce it as a change.
            self.registry
                .observe_price(&entry.symbol, price, observed_at);
            let record = PriceRecord::new(entry.symbol.clone(), price, observed_at);
            if let Err(e) = self.store.append(&record).await {
                counter!("stocks_feed_persist_failures_total").increment(1);
                tracing::warn!(symbol = %entry.symbol, error = %e, "Failed to persist baseline");
            }
            tracing::debug!(symbol = %entry.symbol, price = %price, "Recorded baseline price");
            return;
        };

        let significant = match relative_change(previous, price) {
            Some(change) => change >= self.config.max_percentage_change,
            // A zero baseline makes the ratio undefined; any move off
            // zero counts as significant.
            None => !price.is_zero(),
        };

        if !significant {
            tracing::trace!(
                symbol = %entry.symbol,
                previous = %previous,
                current = %price,
                "Change below threshold"
            );
            return;
        }

        self.registry
            .observe_price(&entry.symbol, price, observed_at);

        let record = PriceRecord::new(entry.symbol.clone(), price, observed_at);
        if let Err(e) = self.store.append(&record).await {
            // The in-memory baseline is already updated so the next
            // comparison stays correct, but an unpersisted change is
            // not announced.
            counter!("stocks_feed_persist_failures_total").increment(1);
            tracing::warn!(
                symbol = %entry.symbol,
                error = %e,
                "Failed to persist price change, skipping publish"
            );
            return;
        }

        let update = PriceUpdate::new(entry.symbol.clone(), price, observed_at);
        let receivers = self.publisher.publish(&update);
        self.registry.mark_broadcast(&entry.symbol, observed_at);

        counter!("stocks_feed_updates_published_total").increment(1);
        tracing::debug!(
            symbol = %entry.symbol,
            previous = %previous,
            current = %price,
            receivers,
            "Published price update"
        );
    }
}
