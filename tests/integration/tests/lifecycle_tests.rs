//! Client lifecycle tests
//!
//! Run with: cargo test -p integration-tests --test lifecycle_tests

use std::time::Duration;

use bridge_client::{BridgeError, SendOptions};
use integration_tests::{connect, fast_options, timed, wait_until, MockPeer};
use tokio_util::sync::CancellationToken;

// ============================================================================
// Close
// ============================================================================

#[tokio::test]
async fn test_close_fails_pending_and_releases_socket() {
    let peer = MockPeer::bind().await.unwrap();
    let options = fast_options().with_command_timeout(Duration::from_secs(10));
    let mut session = connect(&peer, options).await.unwrap();
    let mut events = session.client.subscribe(0);

    let client = session.client.clone();
    let pending = tokio::spawn(async move { timed(client.send("hangs")).await });
    session.conn.recv_command().await.unwrap();

    session.client.close().await.unwrap();

    let (result, elapsed) = pending.await.unwrap();
    assert!(matches!(result, Err(BridgeError::Closed)), "{result:?}");
    assert!(elapsed < Duration::from_secs(2), "took {elapsed:?}");

    session.conn.expect_closed().await.unwrap();
    assert!(events.recv().await.is_none());

    let status = session.client.status();
    assert!(status.closed);
    assert!(!status.connected);
    assert_eq!(status.pending_requests, 0);
    assert_eq!(status.subscribers, 0);
}

#[tokio::test]
async fn test_send_after_close_returns_immediately() {
    let peer = MockPeer::bind().await.unwrap();
    let session = connect(&peer, fast_options()).await.unwrap();

    session.client.close().await.unwrap();
    session.client.close().await.unwrap();

    let (result, elapsed) = timed(session.client.send("late")).await;
    assert!(matches!(result, Err(BridgeError::Closed)));
    assert!(elapsed < Duration::from_millis(50));

    // start after close does not dial again
    session.client.start(CancellationToken::new());
    assert!(peer.accept_within(Duration::from_millis(200)).await.is_err());
}

#[tokio::test]
async fn test_close_before_start() {
    let client = bridge_client::BridgeClient::new("127.0.0.1:1", fast_options());
    client.close().await.unwrap();
    assert!(client.is_closed());
    assert!(matches!(client.send("x").await, Err(BridgeError::Closed)));
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn test_start_token_shuts_client_down() {
    let peer = MockPeer::bind().await.unwrap();
    let mut session = connect(&peer, fast_options()).await.unwrap();

    session.token.cancel();

    session.conn.expect_closed().await.unwrap();
    let client = session.client.clone();
    assert!(wait_until(Duration::from_secs(1), || !client.is_connected()).await);
    assert!(client.is_closed());
    assert!(matches!(client.send("x").await, Err(BridgeError::Closed)));
}

#[tokio::test]
async fn test_caller_cancellation_leaves_connection_up() {
    let peer = MockPeer::bind().await.unwrap();
    let mut session = connect(&peer, fast_options()).await.unwrap();

    let cancel = CancellationToken::new();
    let client = session.client.clone();
    let options = SendOptions::default().with_cancel(cancel.clone()).with_id("c1");
    let pending = tokio::spawn(async move { client.send_with("hangs", options).await });

    session.conn.recv_command().await.unwrap();
    cancel.cancel();

    assert!(matches!(pending.await.unwrap(), Err(BridgeError::Cancelled)));
    assert_eq!(session.client.status().pending_requests, 0);

    // a response for the cancelled id is dropped, later commands still work
    session.conn.respond("c1", "late").await.unwrap();
    let client = session.client.clone();
    let next = tokio::spawn(async move { client.send("next").await });
    let (id, _) = session.conn.recv_command().await.unwrap();
    session.conn.respond(&id, "fine").await.unwrap();
    assert_eq!(&next.await.unwrap().unwrap()[..], b"fine");
    assert!(session.client.is_connected());
}
