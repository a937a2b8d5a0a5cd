//! Exchange Rate Table
//!
//! In-memory snapshot of exchange rates relative to the reference currency
//! (EUR, always 1.0). Refreshes replace the whole snapshot rather than
//! merging entries in place, so a reader never observes a table where some
//! currencies reflect the new tick and others the old one.
//!
//! # Concurrency
//!
//! The current snapshot is an `Arc<HashMap>` behind a `parking_lot::RwLock`.
//! Readers clone the `Arc` under a brief read lock and compute against the
//! immutable snapshot; `update` builds a new map and swaps the `Arc` under
//! the write lock.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::domain::currency::Currency;

/// The fixed currency all stored rates are expressed against.
pub const REFERENCE_CURRENCY: Currency = Currency::Eur;

/// Error returned by cross-rate lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RateError {
    /// The currency is absent from the current snapshot.
    #[error("no rate available for currency {0}")]
    UnknownCurrency(Currency),
}

/// Snapshot table of reference-relative exchange rates.
///
/// Created empty; the rate monitor populates it once synchronously at
/// startup and then refreshes it in place on every tick. A failed refresh
/// leaves the previous snapshot untouched.
#[derive(Debug, Default)]
pub struct RateTable {
    snapshot: RwLock<Arc<HashMap<Currency, f64>>>,
}

impl RateTable {
    /// Create an empty rate table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically replace the snapshot with `new_rates`.
    ///
    /// The reference currency is always forced to exactly 1.0, whatever the
    /// feed delivered for it.
    pub fn update(&self, mut new_rates: HashMap<Currency, f64>) {
        new_rates.insert(REFERENCE_CURRENCY, 1.0);
        *self.snapshot.write() = Arc::new(new_rates);
    }

    /// Compute the cross rate `table[destination] / table[base]`.
    ///
    /// # Errors
    ///
    /// Returns `RateError::UnknownCurrency` naming whichever code is absent
    /// from the current snapshot.
    pub fn rate(&self, base: Currency, destination: Currency) -> Result<f64, RateError> {
        let snapshot = self.load();
        let base_rate = snapshot
            .get(&base)
            .copied()
            .ok_or(RateError::UnknownCurrency(base))?;
        let destination_rate = snapshot
            .get(&destination)
            .copied()
            .ok_or(RateError::UnknownCurrency(destination))?;

        Ok(destination_rate / base_rate)
    }

    /// Clone a handle to the current immutable snapshot.
    #[must_use]
    pub fn load(&self) -> Arc<HashMap<Currency, f64>> {
        Arc::clone(&self.snapshot.read())
    }

    /// Number of currencies in the current snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot.read().len()
    }

    /// Whether the table has ever been successfully populated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshot.read().is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
