//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// ECB exchange rate feed adapter.
pub mod ecb;

/// gRPC rate service implementation.
pub mod grpc;

/// Broadcast channel for rate update events.
pub mod broadcast;

/// Configuration loading.
pub mod config;

/// Health check HTTP endpoint.
pub mod health;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Rate refresh background task.
pub mod monitor;

/// OpenTelemetry tracing integration.
pub mod telemetry;
