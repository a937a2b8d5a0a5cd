//! Port Interfaces
//!
//! Driven-port contracts in the Hexagonal Architecture sense. The rate
//! monitor depends on `RateProvider` rather than on a concrete HTTP client,
//! so refresh behavior is testable without a network.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::currency::Currency;

/// Error returned by a rate feed fetch.
///
/// Feed-level failures are recovered locally by the monitor (logged, prior
/// snapshot retained); they never reach RPC callers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedError {
    /// Transport failure reaching the feed.
    #[error("rate feed unavailable: {0}")]
    Unavailable(String),
    /// The feed answered with a non-success status.
    #[error("rate feed returned status {0}")]
    UnexpectedStatus(u16),
    /// The document or a numeric rate field could not be parsed.
    #[error("rate feed parse error: {0}")]
    Parse(String),
}

/// Source of reference-relative exchange rates.
///
/// One `fetch` performs one retrieval and parse; it does not retry and never
/// mutates the rate table. Retry policy belongs to the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Retrieve the current flat currency-to-rate mapping.
    ///
    /// # Errors
    ///
    /// Returns `FeedError` on transport, status, or parse failure.
    async fn fetch(&self) -> Result<HashMap<Currency, f64>, FeedError>;
}
