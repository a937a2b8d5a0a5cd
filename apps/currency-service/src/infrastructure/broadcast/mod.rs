//! Rate Update Broadcast
//!
//! Distributes "rates changed" events from the monitor to the gRPC fan-out
//! loop using a tokio broadcast channel. The event carries no rate data;
//! receivers read the rate table themselves, so a lagged receiver only
//! misses redundant wake-ups, never rate state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

/// Default capacity of the update channel.
///
/// Updates arrive once per refresh interval, so a small buffer suffices.
pub const DEFAULT_UPDATE_CAPACITY: usize = 16;

/// Event emitted after each successful rate refresh.
#[derive(Debug, Clone, Copy)]
pub struct RatesUpdated {
    /// When the new snapshot was installed.
    pub refreshed_at: DateTime<Utc>,
}

/// Broadcast hub for rate update events.
#[derive(Debug)]
pub struct RateUpdateHub {
    tx: broadcast::Sender<RatesUpdated>,
}

impl RateUpdateHub {
    /// Create a hub with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            tx: broadcast::channel(capacity).0,
        }
    }

    /// Create a hub with the default capacity.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_UPDATE_CAPACITY)
    }

    /// Send an update event to all subscribers.
    ///
    /// Returns the number of receivers that got the event, or `None` if
    /// there are no active receivers.
    #[must_use]
    pub fn send(&self, event: RatesUpdated) -> Option<usize> {
        self.tx.send(event).ok()
    }

    /// Get a new receiver for update events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RatesUpdated> {
        self.tx.subscribe()
    }

    /// Number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for RateUpdateHub {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Shared hub reference.
pub type SharedRateUpdateHub = Arc<RateUpdateHub>;

// =============================================================================
// Tests
// =============================================================================
