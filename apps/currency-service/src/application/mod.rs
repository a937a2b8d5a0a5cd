//! Application Layer - Port definitions.
//!
//! Contracts that infrastructure adapters implement, keeping the rate
//! monitor testable against a mock feed.

/// Port interfaces for external systems (rate feed).
pub mod ports;
