#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Stocks Feed - Near-Real-Time Price Broadcaster
//!
//! A service that tracks which stock tickers clients are actively
//! watching, periodically fetches fresh prices for exactly those
//! tickers, and broadcasts an update whenever a price moves by a
//! significant margin.
//!
//! # Layers (inside -> outside)
//!
//! - **Domain**: Core tracking logic and data types
//!   - `price`: Price updates, persisted facts, relative-change math
//!   - `ticker`: Active ticker registry with idle eviction
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Interfaces for the price source, store, and publisher
//!   - `services`: Update scheduler and read-through price lookup
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `source`: Upstream quote provider HTTP client
//!   - `persistence`: Price fact storage
//!   - `broadcast`: Per-symbol channel fan-out
//!   - `http`: REST API, WebSocket feed, and health endpoints
//!   - `config`: Environment-based configuration
//!
//! # Data Flow
//!
//! ```text
//! WS subscribe ──► Active Ticker ──► Update    ──► Quote API
//!                  Registry          Scheduler      │
//!                                       │           ▼
//!                                       │       significant
//!                                       │       change?
//!                                       ▼           │
//!                  Price Store ◄── persist ◄────────┘
//!                                       │
//!                  ┌─────────────┐      ▼
//!    Client 1 ◄────┤  Price Feed │◄── publish
//!    Client N ◄────┤     Hub     │
//!                  └─────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core tracking types with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::price::{PriceRecord, PriceUpdate, Symbol, normalize_symbol, relative_change};
pub use domain::ticker::{ActiveTickerRegistry, TickerSnapshot};

// Application ports and services
pub use application::ports::{
    PriceSource, PriceSourceError, PriceStore, PriceStoreError, UpdatePublisher,
};
pub use application::services::{SchedulerConfig, StockService, StockServiceError, UpdateScheduler};

// Infrastructure config
pub use infrastructure::config::{
    BroadcastSettings, ConfigError, FeedConfig, ServerSettings, SourceSettings, UpdateSettings,
};

// API server (for integration tests)
pub use infrastructure::http::{ApiServer, ApiServerError, ApiServerState, FeedCommand, router};

// Feed hub (for integration tests)
pub use infrastructure::broadcast::{FeedHubStats, PriceFeedHub, SharedPriceFeedHub};

// Adapters
pub use infrastructure::persistence::InMemoryPriceStore;
pub use infrastructure::source::{AlphaVantageClient, AlphaVantageConfig};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::init as init_telemetry;
