//! Port Interfaces
//!
//! Contracts the core calls out through, implemented by infrastructure
//! adapters:
//!
//! - `PriceSource`: fetch the latest price for one ticker from the
//!   rate-limited upstream provider
//! - `PriceStore`: append-only persistence of price facts
//! - `UpdatePublisher`: fan a price update out to a symbol's channel

mod price_source_port;
mod price_store_port;
mod update_publisher_port;

pub use price_source_port::{PriceSource, PriceSourceError};
pub use price_store_port::{PriceStore, PriceStoreError};
pub use update_publisher_port::UpdatePublisher;
