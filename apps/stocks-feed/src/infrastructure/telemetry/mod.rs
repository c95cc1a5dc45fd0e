//! Tracing Initialization
//!
//! Configures the tracing subscriber with env-filter directives and a
//! console formatting layer.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Standard env-filter directives, merged on top of the
//!   defaults below.
//!
//! # Usage
//!
//! ```ignore
//! use stocks_feed::infrastructure::telemetry;
//!
//! // Initialize once at startup
//! telemetry::init();
//!
//! #[tracing::instrument]
//! fn process_tick() {
//!     tracing::info!("Processing tick");
//! }
//! ```

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize the tracing subscriber.
#[allow(clippy::expect_used)]
pub fn init() {
    let env_filter = EnvFilter::from_default_env()
        .add_directive(
            "stocks_feed=info"
                .parse()
                .expect("static directive 'stocks_feed=info' is valid"),
        )
        .add_directive(
            "tower_http=info"
                .parse()
                .expect("static directive 'tower_http=info' is valid"),
        )
        .add_directive(
            "hyper=warn"
                .parse()
                .expect("static directive 'hyper=warn' is valid"),
        );

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
