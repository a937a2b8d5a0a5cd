//! Configuration
//!
//! Environment-variable driven configuration for the currency service.

pub mod settings;

pub use settings::{ConfigError, FeedSettings, ServerSettings, ServiceConfig, StreamSettings};
