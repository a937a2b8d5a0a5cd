//! Currency Service Binary
//!
//! Starts the exchange rate gRPC server.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin currency-service
//! ```
//!
//! # Environment Variables
//!
//! All optional:
//! - `CURRENCY_FEED_URL`: ECB rate feed URL (default: the 90-day history feed)
//! - `CURRENCY_GRPC_PORT`: gRPC server port (default: 9092)
//! - `CURRENCY_HEALTH_PORT`: Health check HTTP port (default: 8082)
//! - `CURRENCY_REFRESH_INTERVAL_SECS`: Seconds between feed refreshes (default: 5)
//! - `CURRENCY_FETCH_TIMEOUT_SECS`: Feed fetch timeout (default: 10)
//! - `CURRENCY_OUTBOUND_CAPACITY`: Per-client response buffer (default: 64)
//! - `CURRENCY_UPDATE_CAPACITY`: Update broadcast buffer (default: 16)
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: true)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4318>)
//! - `OTEL_SERVICE_NAME`: Service name (default: currency-service)
//! - `RUST_LOG`: Log level (default: info)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use currency_service::infrastructure::broadcast::RateUpdateHub;
use currency_service::infrastructure::ecb::EcbRateFeed;
use currency_service::infrastructure::grpc::proto::rates::v1::currency_service_server::CurrencyServiceServer;
use currency_service::infrastructure::grpc::server::{CurrencyServer, CurrencyServerConfig};
use currency_service::infrastructure::health::{HealthServer, HealthServerState};
use currency_service::infrastructure::monitor::RateMonitor;
use currency_service::infrastructure::telemetry;
use currency_service::{RateTable, ServiceConfig, SubscriptionRegistry, init_metrics};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_dotenv();

    // Initialize telemetry (OpenTelemetry + tracing)
    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting currency service");

    // Initialize Prometheus metrics
    let _metrics_handle = init_metrics();

    let config = ServiceConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    // Core shared state
    let table = Arc::new(RateTable::new());
    let registry = Arc::new(SubscriptionRegistry::new());
    let update_hub = Arc::new(RateUpdateHub::new(config.stream.update_capacity));

    // Rate feed and monitor
    let feed = EcbRateFeed::new(config.feed.url.clone(), config.feed.fetch_timeout)?;
    let monitor = RateMonitor::new(
        feed,
        Arc::clone(&table),
        Arc::clone(&update_hub),
        config.feed.refresh_interval,
    );
    let feed_status = monitor.status();

    // The table must hold a snapshot before the first client connects; a
    // failed initial fetch aborts startup.
    monitor.bootstrap().await?;
    let monitor_handle = monitor.spawn(shutdown_token.clone());

    // Initialize gRPC server with its fan-out loop
    let grpc_server_config = CurrencyServerConfig {
        version: env!("CARGO_PKG_VERSION").to_string(),
        outbound_capacity: config.stream.outbound_capacity,
    };
    let grpc_server = Arc::new(CurrencyServer::new(
        grpc_server_config,
        Arc::clone(&table),
        Arc::clone(&registry),
        &update_hub,
        shutdown_token.clone(),
    ));

    // Initialize health server
    let health_state = Arc::new(HealthServerState::new(
        feed_status,
        Arc::clone(&table),
        Arc::clone(&registry),
        Arc::clone(&grpc_server),
    ));
    let health_server = HealthServer::new(
        config.server.health_port,
        health_state,
        shutdown_token.clone(),
    );

    // Spawn health server
    tokio::spawn(async move {
        if let Err(e) = health_server.run().await {
            tracing::error!(error = %e, "Health server error");
        }
    });

    // Spawn gRPC server
    let grpc_addr: SocketAddr = format!("0.0.0.0:{}", config.server.grpc_port).parse()?;
    let grpc_service = CurrencyServiceServer::from_arc(grpc_server);
    let grpc_shutdown = shutdown_token.clone();

    tokio::spawn(async move {
        tracing::info!(addr = %grpc_addr, "gRPC server listening");
        if let Err(e) = Server::builder()
            .add_service(grpc_service)
            .serve_with_shutdown(grpc_addr, grpc_shutdown.cancelled())
            .await
        {
            tracing::error!(error = %e, "gRPC server error");
        }
        tracing::info!("gRPC server stopped");
    });

    tracing::info!("Currency service ready");

    await_shutdown(shutdown_token).await;
    let _ = monitor_handle.await;

    tracing::info!("Currency service stopped");
    Ok(())
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &ServiceConfig) {
    tracing::info!(
        feed_url = %config.feed.url,
        refresh_interval_secs = config.feed.refresh_interval.as_secs(),
        grpc_port = config.server.grpc_port,
        health_port = config.server.health_port,
        "Configuration loaded"
    );
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
