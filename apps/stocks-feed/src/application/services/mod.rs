//! Application Services
//!
//! Services that orchestrate domain logic and coordinate between ports.
//!
//! - `UpdateScheduler`: drives the periodic fetch-compare-persist-publish cycle
//! - `StockService`: read-through price lookup for the request path

mod stock_service;
mod update_scheduler;

pub use stock_service::{StockService, StockServiceError};
pub use update_scheduler::{SchedulerConfig, UpdateScheduler};
