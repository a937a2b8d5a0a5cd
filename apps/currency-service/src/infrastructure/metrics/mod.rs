//! Prometheus Metrics Module
//!
//! Exposes service metrics via Prometheus format, rendered at `/metrics` on
//! the health server port.
//!
//! # Metrics Categories
//!
//! - **Feed**: refresh successes/failures and snapshot size
//! - **Streaming**: rate updates pushed and dropped per fan-out
//! - **Connections**: active gRPC subscriber count

use std::sync::OnceLock;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// # Panics
///
/// Panics if the recorder cannot be installed.
#[allow(clippy::expect_used)]
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "currency_feed_refreshes_total",
        "Total successful rate feed refreshes"
    );
    describe_counter!(
        "currency_feed_refresh_failures_total",
        "Total failed rate feed refreshes"
    );
    describe_gauge!(
        "currency_rates_in_snapshot",
        "Number of currencies in the current rate snapshot"
    );
    describe_counter!(
        "currency_updates_pushed_total",
        "Total rate updates pushed to streaming clients"
    );
    describe_counter!(
        "currency_updates_dropped_total",
        "Total rate updates dropped because a client channel was full or closed"
    );
    describe_gauge!(
        "currency_grpc_clients",
        "Number of active streaming gRPC clients"
    );
    describe_gauge!(
        "currency_subscriptions_total",
        "Total active rate subscriptions across all clients"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record one successful feed refresh installing `rate_count` rates.
pub fn record_refresh(rate_count: usize) {
    counter!("currency_feed_refreshes_total").increment(1);
    #[allow(clippy::cast_precision_loss)]
    gauge!("currency_rates_in_snapshot").set(rate_count as f64);
}

/// Record one failed feed refresh.
pub fn record_refresh_failure() {
    counter!("currency_feed_refresh_failures_total").increment(1);
}

/// Record one rate update pushed to a client.
pub fn record_update_pushed() {
    counter!("currency_updates_pushed_total").increment(1);
}

/// Record one rate update dropped on a full or closed client channel.
pub fn record_update_dropped() {
    counter!("currency_updates_dropped_total").increment(1);
}

/// Update the active streaming client gauge.
pub fn set_client_count(count: i32) {
    gauge!("currency_grpc_clients").set(f64::from(count));
}

/// Update the total subscription gauge.
pub fn set_subscription_count(count: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("currency_subscriptions_total").set(count as f64);
}
