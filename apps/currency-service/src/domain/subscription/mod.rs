//! Subscription Registry
//!
//! Tracks, per active streaming connection, the ordered set of
//! (base, destination) pairs the client has subscribed to. Duplicate pairs
//! on the same connection are rejected, not merged; a pair lives exactly as
//! long as its connection.
//!
//! # Concurrency
//!
//! The registry is the one structure shared between every connection's
//! receive loop (inserts) and the single fan-out loop (full scans). All
//! access goes through one `parking_lot::Mutex`, held only for the
//! structural mutation or the snapshot copy; rate computation and network
//! sends happen outside the lock.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::domain::currency::Currency;

/// Unique identifier for one open streaming session.
pub type ConnectionId = u64;

/// A (base, destination) currency pair a client subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RatePair {
    /// Currency the client converts from.
    pub base: Currency,
    /// Currency the client converts to.
    pub destination: Currency,
}

impl RatePair {
    /// Create a new pair.
    #[must_use]
    pub const fn new(base: Currency, destination: Currency) -> Self {
        Self { base, destination }
    }
}

/// Error returned by `subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubscribeError {
    /// This exact pair is already recorded for the connection.
    #[error("subscription for {} -> {} already exists", .0.base, .0.destination)]
    AlreadyExists(RatePair),
}

/// Registry of per-connection rate subscriptions.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    connections: Mutex<HashMap<ConnectionId, Vec<RatePair>>>,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a subscription for `conn`.
    ///
    /// Pairs are kept in insertion order per connection.
    ///
    /// # Errors
    ///
    /// Returns `SubscribeError::AlreadyExists` if this exact pair is already
    /// recorded for `conn`; the registry is left unchanged.
    pub fn subscribe(&self, conn: ConnectionId, pair: RatePair) -> Result<(), SubscribeError> {
        let mut connections = self.connections.lock();
        let pairs = connections.entry(conn).or_default();

        if pairs.contains(&pair) {
            return Err(SubscribeError::AlreadyExists(pair));
        }

        pairs.push(pair);
        Ok(())
    }

    /// Copy all (connection, pairs) entries for fan-out iteration.
    ///
    /// Iteration order across connections is unspecified; pairs within one
    /// connection appear in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(ConnectionId, Vec<RatePair>)> {
        self.connections
            .lock()
            .iter()
            .map(|(&conn, pairs)| (conn, pairs.clone()))
            .collect()
    }

    /// Remove all subscriptions owned by `conn`.
    ///
    /// Returns the number of pairs removed. Called on stream teardown.
    pub fn drop_connection(&self, conn: ConnectionId) -> usize {
        self.connections
            .lock()
            .remove(&conn)
            .map_or(0, |pairs| pairs.len())
    }

    /// Number of pairs recorded for one connection.
    #[must_use]
    pub fn subscription_count(&self, conn: ConnectionId) -> usize {
        self.connections.lock().get(&conn).map_or(0, Vec::len)
    }

    /// Total pairs across all connections.
    #[must_use]
    pub fn total_subscriptions(&self) -> usize {
        self.connections.lock().values().map(Vec::len).sum()
    }

    /// Number of connections with at least one subscription.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }
}

// =============================================================================
// Tests
// =============================================================================
