//! gRPC Rate Service Implementation
//!
//! Implements the `CurrencyService` gRPC service: the unary `GetRate` lookup
//! and the bidirectional `SubscribeRates` stream that pushes fresh rates to
//! subscribed clients after every feed refresh.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tonic::{Code, Request, Response, Status};
use tonic_types::{ErrorDetails, StatusExt};

use super::proto::rates::v1::{
    self as proto, RateRequest, RateResponse, StreamingRateResponse, SubscriptionError,
    currency_service_server::CurrencyService, streaming_rate_response,
};
use crate::domain::currency::Currency;
use crate::domain::rates::{RateError, RateTable};
use crate::domain::subscription::{
    ConnectionId, RatePair, SubscribeError, SubscriptionRegistry,
};
use crate::infrastructure::broadcast::SharedRateUpdateHub;
use crate::infrastructure::metrics;

// =============================================================================
// Type Aliases
// =============================================================================

type StreamResult<T> = Result<Response<T>, Status>;
type BoxedStream<T> = Pin<Box<dyn Stream<Item = Result<T, Status>> + Send>>;
type OutboundSender = mpsc::Sender<Result<StreamingRateResponse, Status>>;
type OutboundMap = Arc<Mutex<HashMap<ConnectionId, OutboundSender>>>;

// =============================================================================
// Server Configuration
// =============================================================================

/// Configuration for the gRPC rate server.
#[derive(Debug, Clone)]
pub struct CurrencyServerConfig {
    /// Service version string.
    pub version: String,
    /// Capacity of each client's outbound response channel.
    pub outbound_capacity: usize,
}

impl Default for CurrencyServerConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            outbound_capacity: 64,
        }
    }
}

// =============================================================================
// Server Implementation
// =============================================================================

/// gRPC server for rate lookups and rate subscriptions.
pub struct CurrencyServer {
    config: CurrencyServerConfig,
    table: Arc<RateTable>,
    registry: Arc<SubscriptionRegistry>,
    client_count: Arc<AtomicI32>,
    outbound: OutboundMap,
}

impl CurrencyServer {
    /// Create a new gRPC rate server and spawn its fan-out loop.
    ///
    /// The fan-out loop listens on `update_hub` and pushes one rate per
    /// subscribed pair to every connected stream after each refresh. It runs
    /// until `shutdown` is cancelled.
    #[must_use]
    pub fn new(
        config: CurrencyServerConfig,
        table: Arc<RateTable>,
        registry: Arc<SubscriptionRegistry>,
        update_hub: &SharedRateUpdateHub,
        shutdown: CancellationToken,
    ) -> Self {
        let server = Self {
            config,
            table: Arc::clone(&table),
            registry: Arc::clone(&registry),
            client_count: Arc::new(AtomicI32::new(0)),
            outbound: Arc::new(Mutex::new(HashMap::new())),
        };

        let outbound = Arc::clone(&server.outbound);
        let mut updates = update_hub.subscribe();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => {
                        tracing::info!("Rate fan-out loop shutting down");
                        break;
                    }
                    event = updates.recv() => match event {
                        Ok(_) => fan_out(&table, &registry, &outbound),
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            // The table already holds the latest snapshot, so
                            // a single catch-up pass covers the missed ticks.
                            tracing::warn!(lagged = n, "Rate fan-out lagged behind updates");
                            fan_out(&table, &registry, &outbound);
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        });

        server
    }

    /// Version string the server reports.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.config.version
    }

    /// Number of currently connected streaming clients.
    #[must_use]
    pub fn client_count(&self) -> i32 {
        self.client_count.load(Ordering::Relaxed)
    }
}

#[tonic::async_trait]
impl CurrencyService for CurrencyServer {
    async fn get_rate(&self, request: Request<RateRequest>) -> StreamResult<RateResponse> {
        let req = request.into_inner();
        let pair = decode_pair(&req)?;

        if pair.base == pair.destination {
            return Err(same_currency_status(&req, pair.base));
        }

        let rate = self
            .table
            .rate(pair.base, pair.destination)
            .map_err(|RateError::UnknownCurrency(currency)| {
                Status::not_found(format!("no rate available for currency {currency}"))
            })?;

        tracing::debug!(base = %pair.base, destination = %pair.destination, rate, "Rate lookup");

        Ok(Response::new(RateResponse {
            base: req.base,
            destination: req.destination,
            rate,
        }))
    }

    type SubscribeRatesStream = BoxedStream<StreamingRateResponse>;

    async fn subscribe_rates(
        &self,
        request: Request<tonic::Streaming<RateRequest>>,
    ) -> StreamResult<Self::SubscribeRatesStream> {
        let in_stream = request.into_inner();

        let conn_id = uuid::Uuid::new_v4().as_u64_pair().0;
        let connected = self.client_count.fetch_add(1, Ordering::Relaxed) + 1;
        metrics::set_client_count(connected);
        tracing::info!(conn_id, connected, "Subscription stream opened");

        let (tx, grpc_rx) = mpsc::channel(self.config.outbound_capacity);
        self.outbound.lock().insert(conn_id, tx.clone());

        let registry = Arc::clone(&self.registry);
        let outbound = Arc::clone(&self.outbound);
        let client_count = Arc::clone(&self.client_count);

        tokio::spawn(async move {
            pump_subscriptions(in_stream, &tx, &registry, conn_id).await;

            let removed = registry.drop_connection(conn_id);
            outbound.lock().remove(&conn_id);
            let remaining = client_count.fetch_sub(1, Ordering::Relaxed) - 1;
            metrics::set_client_count(remaining);
            metrics::set_subscription_count(registry.total_subscriptions());
            tracing::info!(conn_id, removed, remaining, "Subscription stream closed");
        });

        let stream = ReceiverStream::new(grpc_rx);
        Ok(Response::new(Box::pin(stream) as Self::SubscribeRatesStream))
    }
}

// =============================================================================
// Fan-Out
// =============================================================================

/// Push the current rate for every subscribed pair to its stream.
///
/// The registry lock is released before any rate computation or send; a slow
/// client can only lose its own updates, never delay another stream.
fn fan_out(table: &RateTable, registry: &SubscriptionRegistry, outbound: &OutboundMap) {
    for (conn_id, pairs) in registry.snapshot() {
        let Some(tx) = outbound.lock().get(&conn_id).cloned() else {
            continue;
        };

        for pair in pairs {
            let rate = match table.rate(pair.base, pair.destination) {
                Ok(rate) => rate,
                Err(RateError::UnknownCurrency(currency)) => {
                    tracing::debug!(
                        conn_id,
                        %currency,
                        "Skipping pair absent from current snapshot"
                    );
                    continue;
                }
            };

            let response = StreamingRateResponse {
                message: Some(streaming_rate_response::Message::RateResponse(
                    RateResponse {
                        base: encode_currency(pair.base),
                        destination: encode_currency(pair.destination),
                        rate,
                    },
                )),
            };

            match tx.try_send(Ok(response)) {
                Ok(()) => metrics::record_update_pushed(),
                Err(mpsc::error::TrySendError::Full(_)) => {
                    metrics::record_update_dropped();
                    tracing::warn!(
                        conn_id,
                        base = %pair.base,
                        destination = %pair.destination,
                        "Dropping rate update for slow client"
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    // Stream teardown removes the sender; nothing to do here.
                    metrics::record_update_dropped();
                }
            }
        }
    }
}

// =============================================================================
// Subscription Handling
// =============================================================================

/// Drive the inbound half of a subscription stream until it ends.
///
/// Each subscribe request is recorded or answered with an in-band error. A
/// transport error terminates the outbound stream with that status so the
/// client sees why the stream ended.
async fn pump_subscriptions<S>(
    mut in_stream: S,
    tx: &OutboundSender,
    registry: &SubscriptionRegistry,
    conn_id: ConnectionId,
) where
    S: Stream<Item = Result<RateRequest, Status>> + Unpin,
{
    while let Some(event) = in_stream.next().await {
        match event {
            Ok(req) => {
                if let Some(reply) = subscription_reply(registry, conn_id, &req) {
                    if tx.send(Ok(reply)).await.is_err() {
                        return;
                    }
                }
                metrics::set_subscription_count(registry.total_subscriptions());
            }
            Err(status) => {
                tracing::warn!(conn_id, %status, "Subscription stream errored");
                let _ = tx.send(Err(status)).await;
                return;
            }
        }
    }
}

/// Process one subscribe request from the inbound stream.
///
/// Returns `None` when the subscription was recorded; rejections come back
/// as a `SubscriptionError` to send on the stream, which stays open either
/// way.
fn subscription_reply(
    registry: &SubscriptionRegistry,
    conn_id: ConnectionId,
    req: &RateRequest,
) -> Option<StreamingRateResponse> {
    let pair = match decode_pair(req) {
        Ok(pair) => pair,
        Err(status) => {
            return Some(error_reply(Code::InvalidArgument, status.message(), req));
        }
    };

    if pair.base == pair.destination {
        return Some(error_reply(
            Code::InvalidArgument,
            &format!("cannot subscribe to {} against itself", pair.base),
            req,
        ));
    }

    match registry.subscribe(conn_id, pair) {
        Ok(()) => {
            tracing::info!(
                conn_id,
                base = %pair.base,
                destination = %pair.destination,
                "Subscription recorded"
            );
            None
        }
        Err(err @ SubscribeError::AlreadyExists(_)) => {
            Some(error_reply(Code::AlreadyExists, &err.to_string(), req))
        }
    }
}

fn error_reply(code: Code, message: &str, req: &RateRequest) -> StreamingRateResponse {
    StreamingRateResponse {
        message: Some(streaming_rate_response::Message::Error(SubscriptionError {
            code: code as i32,
            message: message.to_string(),
            request: Some(*req),
        })),
    }
}

// =============================================================================
// Conversion Functions
// =============================================================================

fn decode_pair(req: &RateRequest) -> Result<RatePair, Status> {
    let base = decode_currency(req.base)
        .ok_or_else(|| Status::invalid_argument(format!("invalid base currency: {}", req.base)))?;
    let destination = decode_currency(req.destination).ok_or_else(|| {
        Status::invalid_argument(format!("invalid destination currency: {}", req.destination))
    })?;

    Ok(RatePair::new(base, destination))
}

fn decode_currency(value: i32) -> Option<Currency> {
    proto::Currency::try_from(value)
        .ok()
        .and_then(|currency| currency.as_str_name().parse().ok())
}

fn encode_currency(currency: Currency) -> i32 {
    proto::Currency::from_str_name(currency.code()).map_or(0, |currency| currency as i32)
}

/// `InvalidArgument` status for a request naming the same currency twice,
/// with the offending fields echoed in the error details.
fn same_currency_status(req: &RateRequest, currency: Currency) -> Status {
    let mut details = ErrorDetails::new();
    details.add_bad_request_violation(
        "destination",
        format!("destination must differ from base {currency}"),
    );
    details.set_localized_message("en", format!("{:?}", *req));

    Status::with_error_details(
        Code::InvalidArgument,
        format!("cannot convert {currency} to itself"),
        details,
    )
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn request(base: proto::Currency, destination: proto::Currency) -> RateRequest {
        RateRequest {
            base: base as i32,
            destination: destination as i32,
        }
    }

    #[test]
    fn currency_codes_round_trip_through_proto() {
        for &currency in Currency::ALL {
            let encoded = encode_currency(currency);
            assert_eq!(decode_currency(encoded), Some(currency));
        }
    }

    #[test]
    fn decode_rejects_out_of_range_values() {
        assert_eq!(decode_currency(-1), None);
        assert_eq!(decode_currency(999), None);
    }

    #[test]
    fn decode_pair_names_the_bad_field() {
        let status = decode_pair(&RateRequest {
            base: 999,
            destination: proto::Currency::Usd as i32,
        })
        .unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
        assert!(status.message().contains("base"));

        let status = decode_pair(&RateRequest {
            base: proto::Currency::Usd as i32,
            destination: -3,
        })
        .unwrap_err();
        assert!(status.message().contains("destination"));
    }

    #[test]
    fn same_currency_status_is_invalid_argument_with_details() {
        let req = request(proto::Currency::Usd, proto::Currency::Usd);
        let status = same_currency_status(&req, Currency::Usd);

        assert_eq!(status.code(), Code::InvalidArgument);
        assert!(status.message().contains("USD"));
        let bad_request = status.get_details_bad_request().unwrap();
        assert_eq!(bad_request.field_violations[0].field, "destination");
    }

    #[test]
    fn duplicate_subscription_reported_on_stream() {
        let registry = SubscriptionRegistry::new();
        let req = request(proto::Currency::Eur, proto::Currency::Usd);

        assert!(subscription_reply(&registry, 7, &req).is_none());

        let reply = subscription_reply(&registry, 7, &req).unwrap();
        let Some(streaming_rate_response::Message::Error(error)) = reply.message else {
            panic!("expected error reply");
        };
        assert_eq!(error.code, Code::AlreadyExists as i32);
        assert_eq!(error.request, Some(req));
    }

    #[test]
    fn same_pair_accepted_for_second_connection() {
        let registry = SubscriptionRegistry::new();
        let req = request(proto::Currency::Eur, proto::Currency::Usd);

        assert!(subscription_reply(&registry, 1, &req).is_none());
        assert!(subscription_reply(&registry, 2, &req).is_none());
        assert_eq!(registry.total_subscriptions(), 2);
    }

    #[test]
    fn self_subscription_rejected_without_touching_registry() {
        let registry = SubscriptionRegistry::new();
        let req = request(proto::Currency::Gbp, proto::Currency::Gbp);

        let reply = subscription_reply(&registry, 1, &req).unwrap();
        let Some(streaming_rate_response::Message::Error(error)) = reply.message else {
            panic!("expected error reply");
        };
        assert_eq!(error.code, Code::InvalidArgument as i32);
        assert_eq!(registry.total_subscriptions(), 0);
    }

    #[tokio::test]
    async fn transport_error_terminates_stream_with_status() {
        let registry = SubscriptionRegistry::new();
        let (tx, mut rx) = mpsc::channel(8);

        let inbound = tokio_stream::iter(vec![
            Ok(request(proto::Currency::Eur, proto::Currency::Usd)),
            Err(Status::cancelled("connection reset")),
        ]);
        pump_subscriptions(inbound, &tx, &registry, 1).await;

        // The valid request was recorded silently; the transport error is
        // what the client-visible stream ends with.
        let status = rx.recv().await.unwrap().unwrap_err();
        assert_eq!(status.code(), Code::Cancelled);
        assert_eq!(registry.total_subscriptions(), 1);
    }

    #[tokio::test]
    async fn fan_out_pushes_one_update_per_subscribed_pair() {
        let table = RateTable::new();
        table.update(HashMap::from([
            (Currency::Usd, 1.1),
            (Currency::Gbp, 0.85),
        ]));
        let registry = SubscriptionRegistry::new();
        registry
            .subscribe(1, RatePair::new(Currency::Usd, Currency::Gbp))
            .unwrap();
        registry
            .subscribe(1, RatePair::new(Currency::Eur, Currency::Usd))
            .unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        let outbound: OutboundMap = Arc::new(Mutex::new(HashMap::from([(1, tx)])));

        fan_out(&table, &registry, &outbound);

        let first = rx.recv().await.unwrap().unwrap();
        let Some(streaming_rate_response::Message::RateResponse(rate)) = first.message else {
            panic!("expected rate response");
        };
        assert!((rate.rate - 0.85 / 1.1).abs() < 1e-12);

        let second = rx.recv().await.unwrap().unwrap();
        let Some(streaming_rate_response::Message::RateResponse(rate)) = second.message else {
            panic!("expected rate response");
        };
        assert!((rate.rate - 1.1).abs() < 1e-12);

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn fan_out_skips_pairs_missing_from_snapshot() {
        let table = RateTable::new();
        table.update(HashMap::from([(Currency::Usd, 1.1)]));
        let registry = SubscriptionRegistry::new();
        registry
            .subscribe(1, RatePair::new(Currency::Usd, Currency::Jpy))
            .unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        let outbound: OutboundMap = Arc::new(Mutex::new(HashMap::from([(1, tx)])));

        fan_out(&table, &registry, &outbound);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn fan_out_drops_updates_for_full_channel() {
        let table = RateTable::new();
        table.update(HashMap::from([(Currency::Usd, 1.1)]));
        let registry = SubscriptionRegistry::new();
        registry
            .subscribe(1, RatePair::new(Currency::Eur, Currency::Usd))
            .unwrap();

        let (tx, mut rx) = mpsc::channel(1);
        let outbound: OutboundMap = Arc::new(Mutex::new(HashMap::from([(1, tx)])));

        fan_out(&table, &registry, &outbound);
        fan_out(&table, &registry, &outbound);

        // Exactly one update fit the channel; the second was dropped.
        assert!(rx.recv().await.unwrap().is_ok());
        assert!(rx.try_recv().is_err());
    }
}
