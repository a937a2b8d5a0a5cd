//! Rate Monitor
//!
//! Periodic background task that drives the rate feed: on each tick it
//! fetches the feed, installs the new snapshot into the rate table, and
//! broadcasts a `RatesUpdated` event. A failed fetch is logged and the
//! previous snapshot stays untouched; the loop never stops on feed errors.
//!
//! The first fetch runs synchronously via [`RateMonitor::bootstrap`] before
//! the server starts serving, and a bootstrap failure is fatal: callers get
//! the error instead of a silently empty table.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{FeedError, RateProvider};
use crate::domain::rates::RateTable;
use crate::infrastructure::broadcast::{RatesUpdated, SharedRateUpdateHub};
use crate::infrastructure::metrics;

/// Default interval between feed refreshes.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

// =============================================================================
// Feed Status
// =============================================================================

/// Observable state of the rate feed, reported by the health endpoint.
#[derive(Debug, Default)]
pub struct FeedStatus {
    last_refreshed_at: parking_lot::RwLock<Option<DateTime<Utc>>>,
    last_error: parking_lot::RwLock<Option<String>>,
    rate_count: AtomicUsize,
    consecutive_failures: AtomicU32,
    total_refreshes: AtomicU64,
}

impl FeedStatus {
    fn record_success(&self, rate_count: usize, at: DateTime<Utc>) {
        *self.last_refreshed_at.write() = Some(at);
        *self.last_error.write() = None;
        self.rate_count.store(rate_count, Ordering::Relaxed);
        self.consecutive_failures.store(0, Ordering::Relaxed);
        self.total_refreshes.fetch_add(1, Ordering::Relaxed);
    }

    fn record_failure(&self, error: &FeedError) {
        *self.last_error.write() = Some(error.to_string());
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// When the table was last successfully refreshed.
    #[must_use]
    pub fn last_refreshed_at(&self) -> Option<DateTime<Utc>> {
        *self.last_refreshed_at.read()
    }

    /// Message of the most recent fetch failure, if the last fetch failed.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// Number of currencies in the last installed snapshot.
    #[must_use]
    pub fn rate_count(&self) -> usize {
        self.rate_count.load(Ordering::Relaxed)
    }

    /// Fetch failures since the last success.
    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    /// Total successful refreshes since startup.
    #[must_use]
    pub fn total_refreshes(&self) -> u64 {
        self.total_refreshes.load(Ordering::Relaxed)
    }
}

// =============================================================================
// Rate Monitor
// =============================================================================

/// Periodic driver of feed refreshes and update broadcasts.
pub struct RateMonitor<P> {
    provider: P,
    table: Arc<RateTable>,
    hub: SharedRateUpdateHub,
    interval: Duration,
    status: Arc<FeedStatus>,
}

impl<P: RateProvider + 'static> RateMonitor<P> {
    /// Create a monitor over `provider` feeding `table`.
    ///
    /// The interval is fixed at construction; a slow tick delays the next
    /// scheduled one rather than bursting to catch up.
    #[must_use]
    pub fn new(
        provider: P,
        table: Arc<RateTable>,
        hub: SharedRateUpdateHub,
        interval: Duration,
    ) -> Self {
        Self {
            provider,
            table,
            hub,
            interval,
            status: Arc::new(FeedStatus::default()),
        }
    }

    /// Handle to the feed status for the health endpoint.
    #[must_use]
    pub fn status(&self) -> Arc<FeedStatus> {
        Arc::clone(&self.status)
    }

    /// Populate the table once, synchronously, before serving.
    ///
    /// Broadcasts the initial `RatesUpdated` event; listeners subscribed
    /// before bootstrap see the first snapshot like any later refresh.
    ///
    /// # Errors
    ///
    /// Propagates the `FeedError` of the initial fetch; the caller decides
    /// whether to abort startup.
    pub async fn bootstrap(&self) -> Result<(), FeedError> {
        let rates = self.provider.fetch().await?;
        let count = rates.len();
        self.table.update(rates);
        let refreshed_at = Utc::now();
        self.status.record_success(count, refreshed_at);
        metrics::record_refresh(count);
        tracing::info!(rates = count, "Initial rate snapshot installed");

        if self.hub.send(RatesUpdated { refreshed_at }).is_none() {
            tracing::trace!("No update listeners registered");
        }
        Ok(())
    }

    /// Spawn the periodic refresh loop.
    ///
    /// Runs until `shutdown` is cancelled. Not restartable once stopped.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first interval tick fires immediately; skip it, bootstrap
            // already installed a snapshot.
            ticker.tick().await;

            loop {
                tokio::select! {
                    () = shutdown.cancelled() => {
                        tracing::info!("Rate monitor stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        self.refresh().await;
                    }
                }
            }
        })
    }

    /// One refresh: fetch, install, broadcast. Failures are non-fatal.
    async fn refresh(&self) {
        match self.provider.fetch().await {
            Ok(rates) => {
                let count = rates.len();
                self.table.update(rates);
                let refreshed_at = Utc::now();
                self.status.record_success(count, refreshed_at);
                metrics::record_refresh(count);
                tracing::debug!(rates = count, "Rate snapshot refreshed");

                if self.hub.send(RatesUpdated { refreshed_at }).is_none() {
                    tracing::trace!("No update listeners registered");
                }
            }
            Err(e) => {
                self.status.record_failure(&e);
                metrics::record_refresh_failure();
                tracing::warn!(error = %e, "Rate refresh failed, keeping previous snapshot");
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
