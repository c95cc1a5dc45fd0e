//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port
//! interfaces defined in the application layer.

/// Symbol-keyed broadcast channels for update fan-out.
pub mod broadcast;

/// Configuration loading from environment variables.
pub mod config;

/// HTTP API, WebSocket feed, and health endpoints.
pub mod http;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Price fact persistence adapters.
pub mod persistence;

/// Upstream quote provider client.
pub mod source;

/// Tracing subscriber initialization.
pub mod telemetry;
