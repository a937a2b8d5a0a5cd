//! gRPC Service Integration Tests
//!
//! Tests the full flow from rate refresh to gRPC client reception.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tonic::transport::{Channel, Server};
use tonic::{Code, Request};

use currency_service::{
    Currency, CurrencyServer, CurrencyServerConfig, RateTable, RateUpdateHub, RatesUpdated,
    SharedRateUpdateHub, SubscriptionRegistry,
    proto::{
        RateRequest, RateResponse, StreamingRateResponse, SubscriptionError,
        currency_service_client::CurrencyServiceClient,
        currency_service_server::CurrencyServiceServer, streaming_rate_response,
    },
};

struct TestContext {
    client: CurrencyServiceClient<Channel>,
    table: Arc<RateTable>,
    hub: SharedRateUpdateHub,
    shutdown: CancellationToken,
    server_handle: tokio::task::JoinHandle<()>,
}

/// Start a test gRPC server on a random port with a populated rate table.
async fn setup_test_server() -> TestContext {
    let table = Arc::new(RateTable::new());
    table.update(HashMap::from([
        (Currency::Usd, 1.1),
        (Currency::Gbp, 0.85),
    ]));
    let registry = Arc::new(SubscriptionRegistry::new());
    let hub = Arc::new(RateUpdateHub::with_defaults());
    let shutdown = CancellationToken::new();

    let config = CurrencyServerConfig {
        version: "test-0.0.1".to_string(),
        outbound_capacity: 64,
    };
    let server = CurrencyServer::new(
        config,
        Arc::clone(&table),
        Arc::clone(&registry),
        &hub,
        shutdown.clone(),
    );

    // Find an available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    // Start gRPC server
    let server_handle = tokio::spawn(async move {
        Server::builder()
            .add_service(CurrencyServiceServer::new(server))
            .serve_with_incoming(tokio_stream::wrappers::TcpListenerStream::new(listener))
            .await
            .unwrap();
    });

    // Give server time to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Create client
    let client = CurrencyServiceClient::connect(format!("http://{addr}"))
        .await
        .unwrap();

    TestContext {
        client,
        table,
        hub,
        shutdown,
        server_handle,
    }
}

fn rate_request(base: currency_service::proto::Currency, destination: currency_service::proto::Currency) -> RateRequest {
    RateRequest {
        base: base as i32,
        destination: destination as i32,
    }
}

/// Open a subscription stream and return the request sender plus the
/// response stream.
async fn open_subscription(
    client: &mut CurrencyServiceClient<Channel>,
) -> (
    mpsc::Sender<RateRequest>,
    tonic::Streaming<StreamingRateResponse>,
) {
    let (tx, rx) = mpsc::channel(8);
    let stream = client
        .subscribe_rates(Request::new(ReceiverStream::new(rx)))
        .await
        .unwrap()
        .into_inner();
    (tx, stream)
}

fn trigger_refresh(hub: &RateUpdateHub) {
    let _ = hub.send(RatesUpdated {
        refreshed_at: Utc::now(),
    });
}

fn expect_rate(message: StreamingRateResponse) -> RateResponse {
    match message.message {
        Some(streaming_rate_response::Message::RateResponse(rate)) => rate,
        other => panic!("expected rate response, got {other:?}"),
    }
}

fn expect_error(message: StreamingRateResponse) -> SubscriptionError {
    match message.message {
        Some(streaming_rate_response::Message::Error(error)) => error,
        other => panic!("expected subscription error, got {other:?}"),
    }
}

// =============================================================================
// GetRate Tests
// =============================================================================

#[tokio::test]
async fn test_get_rate_returns_cross_rate() {
    use currency_service::proto::Currency as Proto;
    let mut ctx = setup_test_server().await;

    let response = ctx
        .client
        .get_rate(Request::new(rate_request(Proto::Usd, Proto::Gbp)))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(response.base, Proto::Usd as i32);
    assert_eq!(response.destination, Proto::Gbp as i32);
    assert!((response.rate - 0.85 / 1.1).abs() < 1e-12);

    ctx.shutdown.cancel();
    ctx.server_handle.abort();
}

#[tokio::test]
async fn test_get_rate_from_reference_currency() {
    use currency_service::proto::Currency as Proto;
    let mut ctx = setup_test_server().await;

    let response = ctx
        .client
        .get_rate(Request::new(rate_request(Proto::Eur, Proto::Usd)))
        .await
        .unwrap()
        .into_inner();

    assert!((response.rate - 1.1).abs() < 1e-12);

    ctx.shutdown.cancel();
    ctx.server_handle.abort();
}

#[tokio::test]
async fn test_get_rate_same_currency_is_invalid_argument() {
    use currency_service::proto::Currency as Proto;
    let mut ctx = setup_test_server().await;

    let status = ctx
        .client
        .get_rate(Request::new(rate_request(Proto::Usd, Proto::Usd)))
        .await
        .unwrap_err();

    assert_eq!(status.code(), Code::InvalidArgument);
    assert!(status.message().contains("USD"));

    ctx.shutdown.cancel();
    ctx.server_handle.abort();
}

#[tokio::test]
async fn test_get_rate_unknown_currency_is_not_found() {
    use currency_service::proto::Currency as Proto;
    let mut ctx = setup_test_server().await;

    // JPY is a valid code but absent from the test snapshot.
    let status = ctx
        .client
        .get_rate(Request::new(rate_request(Proto::Usd, Proto::Jpy)))
        .await
        .unwrap_err();

    assert_eq!(status.code(), Code::NotFound);
    assert!(status.message().contains("JPY"));

    ctx.shutdown.cancel();
    ctx.server_handle.abort();
}

#[tokio::test]
async fn test_get_rate_reflects_latest_refresh() {
    use currency_service::proto::Currency as Proto;
    let mut ctx = setup_test_server().await;

    ctx.table.update(HashMap::from([(Currency::Usd, 1.25)]));

    let response = ctx
        .client
        .get_rate(Request::new(rate_request(Proto::Eur, Proto::Usd)))
        .await
        .unwrap()
        .into_inner();

    assert!((response.rate - 1.25).abs() < 1e-12);

    ctx.shutdown.cancel();
    ctx.server_handle.abort();
}

// =============================================================================
// SubscribeRates Tests
// =============================================================================

#[tokio::test]
async fn test_subscription_receives_update_after_refresh() {
    use currency_service::proto::Currency as Proto;
    let mut ctx = setup_test_server().await;

    let (tx, mut stream) = open_subscription(&mut ctx.client).await;
    tx.send(rate_request(Proto::Usd, Proto::Gbp)).await.unwrap();

    // Give the server time to record the subscription
    tokio::time::sleep(Duration::from_millis(50)).await;

    ctx.table.update(HashMap::from([
        (Currency::Usd, 1.2),
        (Currency::Gbp, 0.9),
    ]));
    trigger_refresh(&ctx.hub);

    let received = timeout(Duration::from_secs(2), stream.message())
        .await
        .expect("timeout waiting for update")
        .expect("stream error")
        .expect("no message");

    let rate = expect_rate(received);
    assert_eq!(rate.base, Proto::Usd as i32);
    assert_eq!(rate.destination, Proto::Gbp as i32);
    assert!((rate.rate - 0.9 / 1.2).abs() < 1e-12);

    // Exactly one update per refresh
    let result = timeout(Duration::from_millis(100), stream.message()).await;
    assert!(result.is_err(), "expected no further messages");

    ctx.shutdown.cancel();
    ctx.server_handle.abort();
}

#[tokio::test]
async fn test_subscription_pushes_on_every_refresh() {
    use currency_service::proto::Currency as Proto;
    let mut ctx = setup_test_server().await;

    let (tx, mut stream) = open_subscription(&mut ctx.client).await;
    tx.send(rate_request(Proto::Eur, Proto::Usd)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    for expected in [1.2, 1.3, 1.4] {
        ctx.table.update(HashMap::from([(Currency::Usd, expected)]));
        trigger_refresh(&ctx.hub);

        let received = timeout(Duration::from_secs(2), stream.message())
            .await
            .expect("timeout")
            .expect("stream error")
            .expect("no message");
        assert!((expect_rate(received).rate - expected).abs() < 1e-12);
    }

    ctx.shutdown.cancel();
    ctx.server_handle.abort();
}

#[tokio::test]
async fn test_duplicate_subscription_errors_but_keeps_stream_open() {
    use currency_service::proto::Currency as Proto;
    let mut ctx = setup_test_server().await;

    let (tx, mut stream) = open_subscription(&mut ctx.client).await;
    let req = rate_request(Proto::Usd, Proto::Gbp);
    tx.send(req).await.unwrap();
    tx.send(req).await.unwrap();

    // The duplicate is answered on the stream, not with a closed connection.
    let received = timeout(Duration::from_secs(2), stream.message())
        .await
        .expect("timeout")
        .expect("stream error")
        .expect("no message");

    let error = expect_error(received);
    assert_eq!(error.code, Code::AlreadyExists as i32);
    assert!(error.message.contains("already exists"));
    assert_eq!(error.request, Some(req));

    // The original subscription still delivers updates.
    trigger_refresh(&ctx.hub);
    let received = timeout(Duration::from_secs(2), stream.message())
        .await
        .expect("timeout")
        .expect("stream error")
        .expect("no message");
    assert!((expect_rate(received).rate - 0.85 / 1.1).abs() < 1e-12);

    ctx.shutdown.cancel();
    ctx.server_handle.abort();
}

#[tokio::test]
async fn test_self_subscription_rejected_on_stream() {
    use currency_service::proto::Currency as Proto;
    let mut ctx = setup_test_server().await;

    let (tx, mut stream) = open_subscription(&mut ctx.client).await;
    tx.send(rate_request(Proto::Gbp, Proto::Gbp)).await.unwrap();

    let received = timeout(Duration::from_secs(2), stream.message())
        .await
        .expect("timeout")
        .expect("stream error")
        .expect("no message");

    let error = expect_error(received);
    assert_eq!(error.code, Code::InvalidArgument as i32);
    assert!(error.message.contains("GBP"));

    ctx.shutdown.cancel();
    ctx.server_handle.abort();
}
