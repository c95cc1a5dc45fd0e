//! Application Layer - Use cases and port definitions.
//!
//! This layer contains the application services and port interfaces
//! that define how the domain interacts with external systems.

/// Port interfaces for external systems (quote source, store, publisher).
pub mod ports;

/// Application services driving the fetch-compare-persist-publish cycle.
pub mod services;
