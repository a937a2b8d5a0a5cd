//! Service Configuration Settings
//!
//! Configuration types for the currency service, loaded from environment
//! variables. Every knob has a default; nothing is required, since the ECB
//! feed needs no credentials.

use std::time::Duration;

use crate::infrastructure::broadcast::DEFAULT_UPDATE_CAPACITY;
use crate::infrastructure::ecb::{DEFAULT_FEED_URL, DEFAULT_FETCH_TIMEOUT};
use crate::infrastructure::monitor::DEFAULT_REFRESH_INTERVAL;

/// Server port settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// gRPC server port.
    pub grpc_port: u16,
    /// Health check HTTP port.
    pub health_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            grpc_port: 9092,
            health_port: 8082,
        }
    }
}

/// Rate feed settings.
#[derive(Debug, Clone)]
pub struct FeedSettings {
    /// URL of the ECB XML rate feed.
    pub url: String,
    /// Interval between refreshes.
    pub refresh_interval: Duration,
    /// Timeout for one feed retrieval.
    pub fetch_timeout: Duration,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_FEED_URL.to_string(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// Streaming channel settings.
#[derive(Debug, Clone)]
pub struct StreamSettings {
    /// Capacity of each client's outbound response channel.
    pub outbound_capacity: usize,
    /// Capacity of the rate update broadcast channel.
    pub update_capacity: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            outbound_capacity: 64,
            update_capacity: DEFAULT_UPDATE_CAPACITY,
        }
    }
}

/// Complete service configuration.
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    /// Server port settings.
    pub server: ServerSettings,
    /// Rate feed settings.
    pub feed: FeedSettings,
    /// Streaming channel settings.
    pub stream: StreamSettings,
}

impl ServiceConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if an override is present but empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = match std::env::var("CURRENCY_FEED_URL") {
            Ok(v) if v.is_empty() => {
                return Err(ConfigError::EmptyValue("CURRENCY_FEED_URL".to_string()));
            }
            Ok(v) => v,
            Err(_) => FeedSettings::default().url,
        };

        let server = ServerSettings {
            grpc_port: parse_env_u16("CURRENCY_GRPC_PORT", ServerSettings::default().grpc_port),
            health_port: parse_env_u16(
                "CURRENCY_HEALTH_PORT",
                ServerSettings::default().health_port,
            ),
        };

        let feed = FeedSettings {
            url,
            refresh_interval: parse_env_duration_secs(
                "CURRENCY_REFRESH_INTERVAL_SECS",
                FeedSettings::default().refresh_interval,
            ),
            fetch_timeout: parse_env_duration_secs(
                "CURRENCY_FETCH_TIMEOUT_SECS",
                FeedSettings::default().fetch_timeout,
            ),
        };

        let stream = StreamSettings {
            outbound_capacity: parse_env_usize(
                "CURRENCY_OUTBOUND_CAPACITY",
                StreamSettings::default().outbound_capacity,
            ),
            update_capacity: parse_env_usize(
                "CURRENCY_UPDATE_CAPACITY",
                StreamSettings::default().update_capacity,
            ),
        };

        Ok(Self {
            server,
            feed,
            stream,
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
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
    fn server_settings_defaults() {
        let settings = ServerSettings::default();
        assert_eq!(settings.grpc_port, 9092);
        assert_eq!(settings.health_port, 8082);
    }

    #[test]
    fn feed_settings_defaults() {
        let settings = FeedSettings::default();
        assert_eq!(settings.url, DEFAULT_FEED_URL);
        assert_eq!(settings.refresh_interval, Duration::from_secs(5));
        assert_eq!(settings.fetch_timeout, Duration::from_secs(10));
    }

    #[test]
    fn stream_settings_defaults() {
        let settings = StreamSettings::default();
        assert_eq!(settings.outbound_capacity, 64);
        assert_eq!(settings.update_capacity, DEFAULT_UPDATE_CAPACITY);
    }
}
