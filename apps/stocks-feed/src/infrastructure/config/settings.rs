//! Feed Configuration Settings
//!
//! Configuration types for the stocks feed service, loaded from
//! environment variables. Optional settings fall back to their defaults
//! when unset or unparsable; only the upstream API settings are
//! required.

use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;

/// Update scheduler settings.
#[derive(Debug, Clone)]
pub struct UpdateSettings {
    /// Interval between scheduler ticks.
    pub update_interval: Duration,
    /// Minimum relative price change that triggers a broadcast.
    pub max_percentage_change: Decimal,
    /// How long a ticker may go unaccessed before eviction.
    pub idle_eviction_threshold: Duration,
    /// Maximum concurrent upstream fetches per tick.
    pub fetch_concurrency: usize,
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self {
            update_interval: Duration::from_secs(5),
            max_percentage_change: Decimal::new(2, 2),
            idle_eviction_threshold: Duration::from_secs(300),
            fetch_concurrency: 8,
        }
    }
}

/// Upstream quote provider settings.
#[derive(Clone)]
pub struct SourceSettings {
    /// Base URL of the quote API.
    pub api_url: String,
    /// API key sent with every request.
    pub api_key: String,
    /// How long fetched prices stay served from cache.
    pub cache_ttl: Duration,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl std::fmt::Debug for SourceSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceSettings")
            .field("api_url", &self.api_url)
            .field("api_key", &"[REDACTED]")
            .field("cache_ttl", &self.cache_ttl)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Port serving the REST API, WebSocket feed, and health endpoints.
    pub http_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { http_port: 8080 }
    }
}

/// Broadcast channel settings.
#[derive(Debug, Clone)]
pub struct BroadcastSettings {
    /// Capacity of each per-symbol update channel.
    pub channel_capacity: usize,
}

impl Default for BroadcastSettings {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
        }
    }
}

/// Complete feed service configuration.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Update scheduler settings.
    pub update: UpdateSettings,
    /// Upstream quote provider settings.
    pub source: SourceSettings,
    /// HTTP server settings.
    pub server: ServerSettings,
    /// Broadcast channel settings.
    pub broadcast: BroadcastSettings,
}

impl FeedConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_url = std::env::var("STOCKS_API_URL")
            .map_err(|_| ConfigError::MissingEnvVar("STOCKS_API_URL".to_string()))?;

        let api_key = std::env::var("STOCKS_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("STOCKS_API_KEY".to_string()))?;

        if api_url.is_empty() {
            return Err(ConfigError::EmptyValue("STOCKS_API_URL".to_string()));
        }

        if api_key.is_empty() {
            return Err(ConfigError::EmptyValue("STOCKS_API_KEY".to_string()));
        }

        let update = UpdateSettings {
            update_interval: parse_env_duration_secs(
                "STOCKS_UPDATE_INTERVAL_SECS",
                UpdateSettings::default().update_interval,
            ),
            max_percentage_change: parse_env_decimal(
                "STOCKS_MAX_PERCENTAGE_CHANGE",
                UpdateSettings::default().max_percentage_change,
            ),
            idle_eviction_threshold: parse_env_duration_secs(
                "STOCKS_IDLE_EVICTION_SECS",
                UpdateSettings::default().idle_eviction_threshold,
            ),
            fetch_concurrency: parse_env_usize(
                "STOCKS_FETCH_CONCURRENCY",
                UpdateSettings::default().fetch_concurrency,
            ),
        };

        let source = SourceSettings {
            api_url,
            api_key,
            cache_ttl: parse_env_duration_secs(
                "STOCKS_SOURCE_CACHE_TTL_SECS",
                Duration::from_secs(300),
            ),
            request_timeout: parse_env_duration_secs(
                "STOCKS_SOURCE_TIMEOUT_SECS",
                Duration::from_secs(10),
            ),
        };

        let server = ServerSettings {
            http_port: parse_env_u16("STOCKS_HTTP_PORT", ServerSettings::default().http_port),
        };

        let broadcast = BroadcastSettings {
            channel_capacity: parse_env_usize(
                "STOCKS_FEED_CHANNEL_CAPACITY",
                BroadcastSettings::default().channel_capacity,
            ),
        };

        Ok(Self {
            update,
            source,
            server,
            broadcast,
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
}

fn parse_env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_decimal(key: &str, default: Decimal) -> Decimal {
    std::env::var(key)
        .ok()
        .and_then(|v| Decimal::from_str(&v).ok())
        .unwrap_or(default)
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_settings_defaults() {
        let settings = UpdateSettings::default();
        assert_eq!(settings.update_interval, Duration::from_secs(5));
        assert_eq!(settings.max_percentage_change, Decimal::new(2, 2));
        assert_eq!(settings.idle_eviction_threshold, Duration::from_secs(300));
        assert_eq!(settings.fetch_concurrency, 8);
    }

    #[test]
    fn server_settings_defaults() {
        assert_eq!(ServerSettings::default().http_port, 8080);
    }

    #[test]
    fn broadcast_settings_defaults() {
        assert_eq!(BroadcastSettings::default().channel_capacity, 256);
    }

    #[test]
    fn source_settings_redacted_debug() {
        let settings = SourceSettings {
            api_url: "https://example.test".to_string(),
            api_key: "key123".to_string(),
            cache_ttl: Duration::from_secs(300),
            request_timeout: Duration::from_secs(10),
        };

        let debug = format!("{settings:?}");
        assert!(!debug.contains("key123"));
        assert!(debug.contains("[REDACTED]"));
        assert!(debug.contains("https://example.test"));
    }

    #[test]
    fn decimal_parsing_falls_back_when_unset() {
        // Uses an env var name nothing else defines.
        let parsed = parse_env_decimal("STOCKS_TEST_DECIMAL_UNSET", Decimal::new(2, 2));
        assert_eq!(parsed, Decimal::new(2, 2));
    }

    #[test]
    fn missing_required_var_is_an_error() {
        // From a clean environment the required API settings are absent.
        if std::env::var("STOCKS_API_URL").is_err() {
            assert!(matches!(
                FeedConfig::from_env(),
                Err(ConfigError::MissingEnvVar(_))
            ));
        }
    }
}
