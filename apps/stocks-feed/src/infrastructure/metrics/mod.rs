//! Prometheus Metrics Module
//!
//! Exposes application metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Scheduler**: Tick counts, durations, and published update counts
//! - **Registry**: Active ticker gauge and eviction counts
//! - **Failures**: Upstream fetch and persistence failures
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the API server port. Recording
//! sites call the `metrics` macros directly with the names registered
//! here.

use std::sync::OnceLock;

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// # Panics
///
/// Panics if the recorder cannot be installed.
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let builder = PrometheusBuilder::new();
            let handle = builder
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    // Scheduler counters
    describe_counter!(
        "stocks_feed_ticks_total",
        "Total update scheduler ticks completed"
    );
    describe_counter!(
        "stocks_feed_updates_published_total",
        "Total price updates broadcast to subscribers"
    );
    describe_counter!(
        "stocks_feed_lookup_requests_total",
        "Total price lookup requests served"
    );

    // Failure counters
    describe_counter!(
        "stocks_feed_fetch_failures_total",
        "Total upstream price fetch failures"
    );
    describe_counter!(
        "stocks_feed_persist_failures_total",
        "Total price fact persistence failures"
    );

    // Registry metrics
    describe_gauge!(
        "stocks_feed_active_tickers",
        "Number of tickers currently tracked for updates"
    );
    describe_counter!(
        "stocks_feed_evicted_tickers_total",
        "Total tickers evicted for inactivity"
    );

    // Latency histograms
    describe_histogram!(
        "stocks_feed_tick_duration_seconds",
        "Time to complete one scheduler tick across all tracked tickers"
    );
}
