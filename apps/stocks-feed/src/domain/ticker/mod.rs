//! Active Ticker Registry
//!
//! Tracks the set of tickers that are currently "interesting": every
//! symbol with a recent lookup or an open subscription. The registry is
//! the single piece of mutable state shared between the request path
//! and the update scheduler.
//!
//! # Design
//!
//! Entries are keyed by normalized (uppercased) symbol and held in a
//! fixed number of lock shards so request-path touches are never
//! serialized behind a scheduler tick. Each operation is atomic with
//! respect to a single symbol; `snapshot` copies one shard at a time
//! and never holds a lock across I/O.
//!
//! Entries leave the registry through `evict_stale` only: once a
//! ticker has gone untouched for longer than the idle threshold it is
//! dropped, which bounds growth from one-off lookups.

use std::collections::HashMap;
use std::hash::{BuildHasher, Hash, Hasher, RandomState};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::domain::price::{Symbol, normalize_symbol};

/// Number of lock shards. Plenty for the request-path concurrency this
/// service sees; keyed access only ever takes one shard lock.
const SHARD_COUNT: usize = 16;

/// One tracked ticker.
#[derive(Debug, Clone)]
struct TickerEntry {
    /// Last time any consumer expressed interest. Monotonically
    /// non-decreasing.
    last_accessed_at: DateTime<Utc>,
    /// Most recent price this process has observed, if any.
    last_known_price: Option<Decimal>,
    /// Last time this symbol's price was published, if ever.
    last_broadcast_at: Option<DateTime<Utc>>,
}

/// Point-in-time copy of one tracked ticker.
///
/// Safe to iterate and act on without holding any registry lock; the
/// scheduler only ever works from these copies. Ordering across a
/// snapshot is unspecified (set semantics).
#[derive(Debug, Clone)]
pub struct TickerSnapshot {
    /// Normalized ticker symbol.
    pub symbol: Symbol,
    /// Most recent price observed for the symbol, if any.
    pub last_known_price: Option<Decimal>,
    /// Last time interest was expressed in the symbol.
    pub last_accessed_at: DateTime<Utc>,
}

/// Concurrent registry of actively watched tickers.
///
/// # Example
///
/// ```rust
/// use stocks_feed::domain::ticker::ActiveTickerRegistry;
///
/// let registry = ActiveTickerRegistry::new();
/// registry.touch("aapl");
///
/// let snapshot = registry.snapshot();
/// assert_eq!(snapshot.len(), 1);
/// assert_eq!(snapshot[0].symbol, "AAPL");
/// assert!(snapshot[0].last_known_price.is_none());
/// ```
pub struct ActiveTickerRegistry {
    shards: [RwLock<HashMap<Symbol, TickerEntry>>; SHARD_COUNT],
    hasher: RandomState,
}

impl Default for ActiveTickerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ActiveTickerRegistry {
    /// Create a new, empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shards: std::array::from_fn(|_| RwLock::new(HashMap::new())),
            hasher: RandomState::new(),
        }
    }

    /// Register interest in a symbol. Never fails.
    ///
    /// Creates the entry with no known price if the symbol is unknown;
    /// otherwise only refreshes `last_accessed_at`.
    pub fn touch(&self, symbol: &str) {
        let symbol = normalize_symbol(symbol);
        let now = Utc::now();
        let mut shard = self.shard(&symbol).write();
        shard
            .entry(symbol)
            .and_modify(|entry| entry.last_accessed_at = entry.last_accessed_at.max(now))
            .or_insert(TickerEntry {
                last_accessed_at: now,
                last_known_price: None,
                last_broadcast_at: None,
            });
    }

    /// Record a freshly fetched price for a symbol.
    ///
    /// Creates the entry if absent. Overwrites the known price
    /// unconditionally (the later observation wins, even when the value
    /// is numerically unchanged) and refreshes `last_accessed_at`.
    pub fn observe_price(&self, symbol: &str, price: Decimal, observed_at: DateTime<Utc>) {
        let symbol = normalize_symbol(symbol);
        let mut shard = self.shard(&symbol).write();
        shard
            .entry(symbol)
            .and_modify(|entry| {
                entry.last_known_price = Some(price);
                entry.last_accessed_at = entry.last_accessed_at.max(observed_at);
            })
            .or_insert(TickerEntry {
                last_accessed_at: observed_at,
                last_known_price: Some(price),
                last_broadcast_at: None,
            });
    }

    /// Record that a publish happened for a symbol.
    ///
    /// No-op for unknown symbols: broadcasts only follow observations,
    /// and an entry evicted in between is not worth resurrecting.
    pub fn mark_broadcast(&self, symbol: &str, at: DateTime<Utc>) {
        let symbol = normalize_symbol(symbol);
        let mut shard = self.shard(&symbol).write();
        if let Some(entry) = shard.get_mut(&symbol) {
            entry.last_broadcast_at = Some(at);
        }
    }

    /// Take a point-in-time copy of every tracked ticker.
    ///
    /// Each shard lock is held only for the duration of its copy, so
    /// writers are never blocked for longer than a bounded clone.
    #[must_use]
    pub fn snapshot(&self) -> Vec<TickerSnapshot> {
        let mut entries = Vec::with_capacity(self.len());
        for shard in &self.shards {
            let guard = shard.read();
            entries.extend(guard.iter().map(|(symbol, entry)| TickerSnapshot {
                symbol: symbol.clone(),
                last_known_price: entry.last_known_price,
                last_accessed_at: entry.last_accessed_at,
            }));
        }
        entries
    }

    /// Remove every entry untouched for longer than `idle_threshold`.
    ///
    /// Returns the number of entries removed. Idempotent when nothing
    /// has newly gone stale. This is the only deletion path.
    pub fn evict_stale(&self, idle_threshold: Duration, now: DateTime<Utc>) -> usize {
        // A threshold too large to represent means nothing can be stale.
        let Some(cutoff) = chrono::Duration::from_std(idle_threshold)
            .ok()
            .and_then(|idle| now.checked_sub_signed(idle))
        else {
            return 0;
        };
        let mut removed = 0;
        for shard in &self.shards {
            let mut guard = shard.write();
            let before = guard.len();
            guard.retain(|_, entry| entry.last_accessed_at >= cutoff);
            removed += before - guard.len();
        }
        removed
    }

    /// Most recent price observed for a symbol, if tracked.
    #[must_use]
    pub fn last_known_price(&self, symbol: &str) -> Option<Decimal> {
        let symbol = normalize_symbol(symbol);
        self.shard(&symbol)
            .read()
            .get(&symbol)
            .and_then(|entry| entry.last_known_price)
    }

    /// Last broadcast time for a symbol, if it has ever published.
    #[must_use]
    pub fn last_broadcast_at(&self, symbol: &str) -> Option<DateTime<Utc>> {
        let symbol = normalize_symbol(symbol);
        self.shard(&symbol)
            .read()
            .get(&symbol)
            .and_then(|entry| entry.last_broadcast_at)
    }

    /// Number of tracked tickers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    /// Whether no tickers are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.read().is_empty())
    }

    fn shard(&self, symbol: &Symbol) -> &RwLock<HashMap<Symbol, TickerEntry>> {
        let mut hasher = self.hasher.build_hasher();
        symbol.hash(&mut hasher);
        let index = (hasher.finish() as usize) % SHARD_COUNT;
        &self.shards[index]
    }
}

impl std::fmt::Debug for ActiveTickerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveTickerRegistry")
            .field("tracked", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::Arc;
    use std::thread;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn touch_creates_entry_without_price() {
        let registry = ActiveTickerRegistry::new();
        let before = Utc::now();

        registry.touch("AAPL");

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].symbol, "AAPL");
        assert!(snapshot[0].last_known_price.is_none());
        assert!(snapshot[0].last_accessed_at >= before);
    }

    #[test]
    fn touch_is_case_insensitive() {
        let registry = ActiveTickerRegistry::new();

        registry.touch("aapl");
        registry.touch("AAPL");
        registry.touch(" Aapl ");

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.snapshot()[0].symbol, "AAPL");
    }

    #[test]
    fn touch_does_not_alter_known_price() {
        let registry = ActiveTickerRegistry::new();

        registry.observe_price("AAPL", dec("150"), Utc::now());
        registry.touch("AAPL");

        assert_eq!(registry.last_known_price("AAPL"), Some(dec("150")));
    }

    #[test]
    fn observe_price_creates_entry_if_absent() {
        let registry = ActiveTickerRegistry::new();

        registry.observe_price("MSFT", dec("410.5"), Utc::now());

        assert_eq!(registry.last_known_price("MSFT"), Some(dec("410.5")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn observe_price_overwrites_unconditionally() {
        let registry = ActiveTickerRegistry::new();
        let now = Utc::now();

        registry.observe_price("AAPL", dec("150"), now);
        registry.observe_price("AAPL", dec("150"), now);
        registry.observe_price("AAPL", dec("151"), now);

        assert_eq!(registry.last_known_price("AAPL"), Some(dec("151")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn last_accessed_at_is_monotonic() {
        let registry = ActiveTickerRegistry::new();
        let now = Utc::now();
        let earlier = now - chrono::Duration::seconds(60);

        registry.observe_price("AAPL", dec("150"), now);
        // An observation stamped in the past must not roll the access
        // time backwards.
        registry.observe_price("AAPL", dec("151"), earlier);

        let snapshot = registry.snapshot();
        assert!(snapshot[0].last_accessed_at >= now);
        // The price itself still follows last-write-wins.
        assert_eq!(snapshot[0].last_known_price, Some(dec("151")));
    }

    #[test]
    fn mark_broadcast_records_time() {
        let registry = ActiveTickerRegistry::new();
        let at = Utc::now();

        registry.touch("AAPL");
        registry.mark_broadcast("AAPL", at);

        assert_eq!(registry.last_broadcast_at("AAPL"), Some(at));
    }

    #[test]
    fn mark_broadcast_unknown_symbol_is_noop() {
        let registry = ActiveTickerRegistry::new();

        registry.mark_broadcast("GHOST", Utc::now());

        assert!(registry.is_empty());
    }

    #[test]
    fn evict_stale_removes_only_idle_entries() {
        let registry = ActiveTickerRegistry::new();
        let idle = Duration::from_secs(300);

        registry.touch("OLD");
        registry.touch("FRESH");

        // Pretend five minutes pass for OLD by evicting from the future,
        // then re-touch FRESH so it stays inside the window.
        let future = Utc::now() + chrono::Duration::seconds(301);
        registry.touch("FRESH");
        let removed = registry.evict_stale(idle, future);

        // Both entries were touched at roughly the same instant, so both
        // are stale from the future vantage point.
        assert_eq!(removed, 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn evict_stale_leaves_fresh_entries() {
        let registry = ActiveTickerRegistry::new();

        registry.touch("AAPL");
        registry.touch("MSFT");

        let removed = registry.evict_stale(Duration::from_secs(300), Utc::now());

        assert_eq!(removed, 0);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn evict_stale_is_idempotent() {
        let registry = ActiveTickerRegistry::new();
        registry.touch("AAPL");

        let future = Utc::now() + chrono::Duration::seconds(600);
        let first = registry.evict_stale(Duration::from_secs(300), future);
        let second = registry.evict_stale(Duration::from_secs(300), future);

        assert_eq!(first, 1);
        assert_eq!(second, 0);
    }

    #[test]
    fn concurrent_touch_yields_single_entry() {
        let registry = Arc::new(ActiveTickerRegistry::new());
        let mut handles = vec![];

        for _ in 0..10 {
            let r = Arc::clone(&registry);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    r.touch("AAPL");
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.len(), 1);

        // The access time reflects the latest touch, not an earlier
        // racing one.
        let before_last_touch = Utc::now();
        registry.touch("AAPL");
        let snapshot = registry.snapshot();
        assert!(snapshot[0].last_accessed_at >= before_last_touch);
    }

    #[test]
    fn concurrent_observe_and_snapshot() {
        let registry = Arc::new(ActiveTickerRegistry::new());
        let mut handles = vec![];

        for i in 0..8 {
            let r = Arc::clone(&registry);
            handles.push(thread::spawn(move || {
                for j in 0..50 {
                    r.observe_price(&format!("SYM{i}"), Decimal::from(j), Utc::now());
                    let _ = r.snapshot();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.len(), 8);
        for snap in registry.snapshot() {
            assert_eq!(snap.last_known_price, Some(Decimal::from(49)));
        }
    }

    #[test]
    fn snapshot_is_a_copy() {
        let registry = ActiveTickerRegistry::new();
        registry.observe_price("AAPL", dec("150"), Utc::now());

        let snapshot = registry.snapshot();
        registry.observe_price("AAPL", dec("999"), Utc::now());

        // The snapshot keeps the value from the time it was taken.
        assert_eq!(snapshot[0].last_known_price, Some(dec("150")));
        assert_eq!(registry.last_known_price("AAPL"), Some(dec("999")));
    }
}
