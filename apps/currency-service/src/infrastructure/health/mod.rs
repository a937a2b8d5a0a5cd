//! Health Check and Metrics Endpoint
//!
//! HTTP endpoint for health checks, feed status reporting, and Prometheus
//! metrics. Used by container orchestrators, load balancers, and monitoring
//! systems.
//!
//! # Endpoints
//!
//! - `GET /health` - Returns JSON health status
//! - `GET /healthz` - Kubernetes liveness probe (simple OK)
//! - `GET /readyz` - Kubernetes readiness probe (checks the rate snapshot)
//! - `GET /metrics` - Prometheus metrics in text format

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::domain::rates::RateTable;
use crate::domain::subscription::SubscriptionRegistry;
use crate::infrastructure::grpc::CurrencyServer;
use crate::infrastructure::metrics::get_metrics_handle;
use crate::infrastructure::monitor::FeedStatus;

// =============================================================================
// Health Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status: "healthy", "degraded", or "unhealthy".
    pub status: HealthStatus,
    /// Service version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Rate feed status.
    pub feed: FeedInfo,
    /// Active client count.
    pub clients: ClientStatus,
    /// Subscription statistics.
    pub subscriptions: SubscriptionStatus,
}

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Rates present and the last refresh succeeded.
    Healthy,
    /// Rates present but the most recent refresh failed.
    Degraded,
    /// No rate snapshot has ever been installed.
    Unhealthy,
}

/// Rate feed status.
#[derive(Debug, Clone, Serialize)]
pub struct FeedInfo {
    /// When the table was last refreshed successfully.
    pub last_refreshed_at: Option<DateTime<Utc>>,
    /// Number of currencies in the current snapshot.
    pub rate_count: usize,
    /// Total successful refreshes since startup.
    pub total_refreshes: u64,
    /// Fetch failures since the last success.
    pub consecutive_failures: u32,
    /// Message of the most recent failure, if the last fetch failed.
    pub last_error: Option<String>,
}

/// Active client information.
#[derive(Debug, Clone, Serialize)]
pub struct ClientStatus {
    /// Total active streaming gRPC clients.
    pub total: i32,
}

/// Subscription statistics.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionStatus {
    /// Connections with at least one subscription.
    pub connections: usize,
    /// Total subscribed pairs across all connections.
    pub total_pairs: usize,
}

// =============================================================================
// Health Server State
// =============================================================================

/// Shared state for the health server.
pub struct HealthServerState {
    version: String,
    started_at: Instant,
    feed_status: Arc<FeedStatus>,
    table: Arc<RateTable>,
    registry: Arc<SubscriptionRegistry>,
    grpc_server: Arc<CurrencyServer>,
}

impl HealthServerState {
    /// Create new health server state.
    #[must_use]
    pub fn new(
        feed_status: Arc<FeedStatus>,
        table: Arc<RateTable>,
        registry: Arc<SubscriptionRegistry>,
        grpc_server: Arc<CurrencyServer>,
    ) -> Self {
        Self {
            version: grpc_server.version().to_string(),
            started_at: Instant::now(),
            feed_status,
            table,
            registry,
            grpc_server,
        }
    }
}

// =============================================================================
// Health Server
// =============================================================================

/// Health check HTTP server.
pub struct HealthServer {
    port: u16,
    state: Arc<HealthServerState>,
    cancel: CancellationToken,
}

impl HealthServer {
    /// Create a new health server.
    #[must_use]
    pub const fn new(port: u16, state: Arc<HealthServerState>, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Run the health server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `HealthServerError` if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), HealthServerError> {
        let app = Router::new()
            .route("/health", get(health_handler))
            .route("/healthz", get(liveness_handler))
            .route("/readyz", get(readiness_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(self.state);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| HealthServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "Health server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| HealthServerError::ServerFailed(e.to_string()))?;

        tracing::info!("Health server stopped");
        Ok(())
    }
}

// =============================================================================
// HTTP Handlers
// =============================================================================

async fn health_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    let response = build_health_response(&state);
    let status_code = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(response))
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn readiness_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    // Ready once the initial snapshot is in place
    if state.table.is_empty() {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    } else {
        (StatusCode::OK, "READY")
    }
}

async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            let body = handle.render();
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                body,
            )
        },
    )
}

fn build_health_response(state: &HealthServerState) -> HealthResponse {
    let feed = FeedInfo {
        last_refreshed_at: state.feed_status.last_refreshed_at(),
        rate_count: state.feed_status.rate_count(),
        total_refreshes: state.feed_status.total_refreshes(),
        consecutive_failures: state.feed_status.consecutive_failures(),
        last_error: state.feed_status.last_error(),
    };

    let status = determine_health_status(state.table.is_empty(), &feed);

    HealthResponse {
        status,
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        current_time: Utc::now(),
        feed,
        clients: ClientStatus {
            total: state.grpc_server.client_count(),
        },
        subscriptions: SubscriptionStatus {
            connections: state.registry.connection_count(),
            total_pairs: state.registry.total_subscriptions(),
        },
    }
}

fn determine_health_status(table_empty: bool, feed: &FeedInfo) -> HealthStatus {
    if table_empty {
        HealthStatus::Unhealthy
    } else if feed.consecutive_failures > 0 {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Health server errors.
#[derive(Debug, thiserror::Error)]
pub enum HealthServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_info(consecutive_failures: u32) -> FeedInfo {
        FeedInfo {
            last_refreshed_at: Some(Utc::now()),
            rate_count: 31,
            total_refreshes: 10,
            consecutive_failures,
            last_error: None,
        }
    }

    #[test]
    fn health_status_serialization() {
        assert_eq!(
            serde_json::to_string(&HealthStatus::Healthy).unwrap(),
            "\"healthy\""
        );
        assert_eq!(
            serde_json::to_string(&HealthStatus::Degraded).unwrap(),
            "\"degraded\""
        );
        assert_eq!(
            serde_json::to_string(&HealthStatus::Unhealthy).unwrap(),
            "\"unhealthy\""
        );
    }

    #[test]
    fn populated_table_with_clean_feed_is_healthy() {
        assert_eq!(
            determine_health_status(false, &feed_info(0)),
            HealthStatus::Healthy
        );
    }

    #[test]
    fn populated_table_with_failing_feed_is_degraded() {
        assert_eq!(
            determine_health_status(false, &feed_info(3)),
            HealthStatus::Degraded
        );
    }

    #[test]
    fn empty_table_is_unhealthy() {
        assert_eq!(
            determine_health_status(true, &feed_info(0)),
            HealthStatus::Unhealthy
        );
    }
}
