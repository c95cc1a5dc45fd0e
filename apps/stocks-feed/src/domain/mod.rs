//! Domain Layer - Core feed types and business logic.
//!
//! This layer contains the active-ticker tracking state and the price
//! value types with no external I/O. All types here are pure Rust with
//! serialization support where the wire needs it.

/// Price value types (updates, persisted facts, change math).
pub mod price;

/// Active ticker tracking and eviction.
pub mod ticker;
