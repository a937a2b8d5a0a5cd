//! Domain Layer - Core rate types and business logic.
//!
//! This layer contains the core domain types for exchange rate serving
//! with no external dependencies beyond concurrency primitives.

/// Currency codes known to the service.
pub mod currency;

/// Exchange rate snapshot table and cross-rate computation.
pub mod rates;

/// Subscription tracking per streaming connection.
pub mod subscription;
