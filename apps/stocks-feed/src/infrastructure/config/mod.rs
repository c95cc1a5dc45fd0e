//! Configuration loading from environment variables.

pub mod settings;

pub use settings::{
    BroadcastSettings, ConfigError, FeedConfig, ServerSettings, SourceSettings, UpdateSettings,
};
