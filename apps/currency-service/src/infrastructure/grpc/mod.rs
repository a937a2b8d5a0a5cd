//! gRPC Rate Service
//!
//! Implements the `CurrencyService` gRPC API: unary rate lookups plus the
//! bidirectional subscription stream.
//!
//! # Architecture
//!
//! The server bridges the rate update broadcast (fed by the rate monitor)
//! to downstream gRPC clients. Each `SubscribeRates` stream:
//!
//! 1. Registers an outbound channel keyed by a fresh connection id
//! 2. Records each requested pair with the `SubscriptionRegistry`
//! 3. Receives a pushed rate per subscribed pair on every refresh
//! 4. Cleans up its subscriptions and channel on disconnect

pub mod server;

// Allow clippy warnings and missing docs in generated code
#[allow(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]
pub mod proto {
    pub mod rates {
        pub mod v1 {
            include!("proto/rates.v1.rs");
        }
    }
}

pub use server::{CurrencyServer, CurrencyServerConfig};
