#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Currency Service - Exchange Rate gRPC Server
//!
//! A gRPC service that serves currency exchange rates computed from the
//! European Central Bank's published euro reference rates. Clients can ask
//! for a one-off cross rate or subscribe to currency pairs and receive a
//! pushed rate on every feed refresh.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Core rate logic and data types
//!   - `currency`: The fixed currency code set
//!   - `rates`: Snapshot rate table and cross-rate computation
//!   - `subscription`: Per-connection subscription tracking
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: The rate provider interface the monitor fetches through
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `ecb`: HTTP client and XML parser for the ECB rate feed
//!   - `monitor`: Periodic refresh loop driving the table
//!   - `broadcast`: Rate update event distribution
//!   - `grpc`: gRPC service implementation
//!   - `config`: Configuration loading
//!   - `health`: Health check HTTP endpoint
//!
//! # Data Flow
//!
//! ```text
//! ECB XML feed ──► Rate monitor ──► Rate table
//!                       │               ▲
//!                       ▼               │ lookups
//!                  Update hub ──► gRPC server ──► Client 1..N
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core rate types with no external service dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::currency::{Currency, UnknownCurrencyCode};
pub use domain::rates::{REFERENCE_CURRENCY, RateError, RateTable};
pub use domain::subscription::{
    ConnectionId, RatePair, SubscribeError, SubscriptionRegistry,
};

// Application ports
pub use application::ports::{FeedError, RateProvider};

// Infrastructure config
pub use infrastructure::config::{
    ConfigError, FeedSettings, ServerSettings, ServiceConfig, StreamSettings,
};

// Health server
pub use infrastructure::health::{HealthServer, HealthServerError, HealthServerState};

// Broadcast hub (for integration tests)
pub use infrastructure::broadcast::{RateUpdateHub, RatesUpdated, SharedRateUpdateHub};

// Rate feed and monitor
pub use infrastructure::ecb::EcbRateFeed;
pub use infrastructure::monitor::{FeedStatus, RateMonitor};

// gRPC server (for integration tests)
pub use infrastructure::grpc::{
    proto::rates::v1 as proto,
    server::{CurrencyServer, CurrencyServerConfig},
};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
