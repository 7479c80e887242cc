//! Connection resilience tests
//!
//! Heartbeat, redial backoff, reconnect and circuit breaker behaviour against
//! a scripted peer.
//!
//! Run with: cargo test -p integration-tests --test resilience_tests

use std::sync::Arc;
use std::time::Duration;

use bridge_client::{BreakerState, BridgeClient, BridgeError, Frame};
use integration_tests::{connect, fast_options, timed, unreachable_addr, wait_until, MockPeer};
use tokio_util::sync::CancellationToken;

// ============================================================================
// Heartbeat
// ============================================================================

#[tokio::test]
async fn test_missed_heartbeats_force_reconnect() {
    let peer = MockPeer::bind().await.unwrap();
    let options = fast_options()
        .with_heartbeat(Duration::from_millis(100), Duration::from_millis(50))
        .with_heartbeat_misses(2);
    let session = connect(&peer, options).await.unwrap();

    let mut silent = session.conn.ignore_pings();
    silent.expect_closed().await.unwrap();
    assert!(silent.pings_seen() >= 2);

    // the supervisor dials again
    let _second = peer.accept().await.unwrap();
    let client = session.client.clone();
    assert!(wait_until(Duration::from_secs(2), || client.status().connections == 2).await);
    assert!(client.is_connected());
}

#[tokio::test]
async fn test_single_missed_heartbeat_is_tolerated() {
    let peer = MockPeer::bind().await.unwrap();
    let options = fast_options()
        .with_heartbeat(Duration::from_millis(100), Duration::from_millis(60))
        .with_heartbeat_misses(2);
    let mut session = connect(&peer, options).await.unwrap();

    // answer every second PING only
    let mut pings = 0usize;
    let watched = tokio::time::timeout(Duration::from_millis(1200), async {
        loop {
            match session.conn.recv().await.unwrap() {
                Some(Frame::Ping) => {
                    pings += 1;
                    if pings % 2 == 0 {
                        session.conn.send(Frame::Pong).await.unwrap();
                    }
                }
                Some(_) => {}
                None => panic!("client closed a connection with only single misses"),
            }
        }
    })
    .await;

    assert!(watched.is_err(), "watch loop should run until the deadline");
    assert!(pings >= 5, "saw {pings} pings");
    assert!(session.client.is_connected());
    assert_eq!(session.client.status().connections, 1);
    assert!(session.client.status().last_heartbeat.is_some());
}

#[tokio::test]
async fn test_peer_ping_is_answered() {
    let peer = MockPeer::bind().await.unwrap();
    let mut session = connect(&peer, fast_options()).await.unwrap();

    session.conn.send(Frame::Ping).await.unwrap();
    assert_eq!(session.conn.recv().await.unwrap(), Some(Frame::Pong));
}

// ============================================================================
// Redial
// ============================================================================

#[tokio::test]
async fn test_backoff_while_unreachable() {
    let addr = unreachable_addr().await.unwrap();
    let options = fast_options().with_backoff(Duration::from_millis(50), Duration::from_millis(200));
    let client = BridgeClient::new(addr, options);
    client.start(CancellationToken::new());

    // dials at roughly 0, 50, 150, 350 and 550ms
    tokio::time::sleep(Duration::from_millis(700)).await;

    let status = client.status();
    assert!(!status.connected);
    assert_eq!(status.connections, 0);
    assert!(
        (3..=7).contains(&status.dial_attempts),
        "dial attempts: {}",
        status.dial_attempts
    );

    let err = client.send("list").await.unwrap_err();
    assert!(matches!(err, BridgeError::Unavailable));

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_connects_once_peer_appears() {
    let addr = unreachable_addr().await.unwrap();
    let client = Arc::new(BridgeClient::new(addr.clone(), fast_options()));
    client.start(CancellationToken::new());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!client.is_connected());

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    let (_stream, _) = tokio::time::timeout(Duration::from_secs(3), listener.accept())
        .await
        .unwrap()
        .unwrap();

    let watched = client.clone();
    assert!(wait_until(Duration::from_secs(2), || watched.is_connected()).await);
    assert!(client.status().dial_attempts >= 2);
}

#[tokio::test]
async fn test_connection_loss_fails_pending_and_reconnects() {
    let peer = MockPeer::bind().await.unwrap();
    let mut session = connect(&peer, fast_options()).await.unwrap();

    let client = session.client.clone();
    let pending = tokio::spawn(async move { timed(client.send("hangs")).await });
    session.conn.recv_command().await.unwrap();

    drop(session.conn);

    let (result, elapsed) = pending.await.unwrap();
    assert!(matches!(result, Err(BridgeError::Unavailable)), "{result:?}");
    assert!(elapsed < Duration::from_secs(2), "took {elapsed:?}");

    let second = peer.accept().await.unwrap();
    let client = session.client.clone();
    assert!(wait_until(Duration::from_secs(2), || client.is_connected()).await);

    let server = tokio::spawn(second.serve(|body| format!("echo {body}")));
    let reply = session.client.send("after").await.unwrap();
    assert_eq!(&reply[..], b"echo after");

    session.client.close().await.unwrap();
    assert_eq!(server.await.unwrap().unwrap(), 1);
}

#[tokio::test]
async fn test_fatal_framing_error_reconnects() {
    let peer = MockPeer::bind().await.unwrap();
    let options = fast_options().with_max_body(64);
    let mut session = connect(&peer, options).await.unwrap();

    session.conn.send_raw(b"EVT chat 999999\n").await.unwrap();
    session.conn.expect_closed().await.unwrap();

    let _second = peer.accept().await.unwrap();
    let client = session.client.clone();
    assert!(wait_until(Duration::from_secs(2), || client.status().connections == 2).await);
}

#[tokio::test]
async fn test_flapping_connection_backs_off_with_growing_delay() {
    let peer = MockPeer::bind().await.unwrap();
    let options = fast_options()
        .with_backoff(Duration::from_millis(50), Duration::from_secs(2))
        .with_flap_threshold(Duration::from_secs(2));
    let client = BridgeClient::new(peer.addr(), options);
    client.start(CancellationToken::new());

    // every connection is dropped as soon as it is accepted
    let mut accepted_at = Vec::new();
    for _ in 0..4 {
        let conn = peer.accept().await.unwrap();
        accepted_at.push(tokio::time::Instant::now());
        drop(conn);
    }

    let gaps: Vec<Duration> = accepted_at.windows(2).map(|w| w[1] - w[0]).collect();
    // sleeps of 50, 100 and 200ms between redials
    assert!(gaps[0] >= Duration::from_millis(40), "gaps: {gaps:?}");
    assert!(gaps[1] >= Duration::from_millis(90), "gaps: {gaps:?}");
    assert!(gaps[2] >= Duration::from_millis(180), "gaps: {gaps:?}");
    assert!(gaps[2] > gaps[0], "gaps: {gaps:?}");

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_stable_connection_redials_immediately() {
    let peer = MockPeer::bind().await.unwrap();
    let options = fast_options()
        .with_backoff(Duration::from_millis(400), Duration::from_secs(2))
        .with_flap_threshold(Duration::from_millis(200));
    let client = BridgeClient::new(peer.addr(), options);
    client.start(CancellationToken::new());

    // outlives the flap threshold
    let stable = peer.accept().await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    drop(stable);
    let dropped_at = tokio::time::Instant::now();

    let short = peer.accept().await.unwrap();
    let redial = dropped_at.elapsed();
    assert!(redial < Duration::from_millis(250), "redialed after {redial:?}");

    // a short-lived run waits out the backoff again
    drop(short);
    let dropped_at = tokio::time::Instant::now();
    let _third = peer.accept().await.unwrap();
    let redial = dropped_at.elapsed();
    assert!(redial >= Duration::from_millis(350), "redialed after {redial:?}");

    assert_eq!(client.status().dial_attempts, 3);
    client.close().await.unwrap();
}

// ============================================================================
// Circuit Breaker
// ============================================================================

#[tokio::test]
async fn test_abandoned_half_open_send_does_not_hold_breaker() {
    let peer = MockPeer::bind().await.unwrap();
    let options = fast_options()
        .with_command_timeout(Duration::from_millis(100))
        .with_breaker(1, Duration::from_millis(100));
    let session = connect(&peer, options).await.unwrap();
    let client = session.client.clone();

    // "slow" is never answered
    let mut conn = session.conn;
    let server = tokio::spawn(async move {
        while let Ok((id, body)) = conn.recv_command().await {
            if &body[..] != b"slow" {
                conn.respond(&id, "ok").await.unwrap();
            }
        }
    });

    assert!(matches!(client.send("slow").await, Err(BridgeError::Timeout(_))));
    assert_eq!(client.status().breaker_state, BreakerState::Open);

    tokio::time::sleep(Duration::from_millis(150)).await;
    let abandoned = tokio::time::timeout(Duration::from_millis(10), client.send("slow")).await;
    assert!(abandoned.is_err());

    // the dropped send counts as a failure and reopens the breaker
    assert_eq!(client.status().breaker_state, BreakerState::Open);
    assert!(client.is_connected());

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(&client.send("fast").await.unwrap()[..], b"ok");
    assert_eq!(client.status().breaker_state, BreakerState::Closed);

    client.close().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn test_breaker_opens_and_allows_one_probe() {
    let peer = MockPeer::bind().await.unwrap();
    let options = fast_options()
        .with_command_timeout(Duration::from_millis(100))
        .with_breaker(3, Duration::from_millis(300));
    let session = connect(&peer, options).await.unwrap();
    let client = session.client.clone();

    // the peer stays silent except for "probe"
    let mut conn = session.conn;
    let server = tokio::spawn(async move {
        let mut seen = Vec::new();
        while let Ok((id, body)) = conn.recv_command().await {
            let body = String::from_utf8_lossy(&body).into_owned();
            if body == "probe" {
                conn.respond(&id, "ok").await.unwrap();
            }
            seen.push(body);
        }
        seen
    });

    for _ in 0..3 {
        let err = client.send("slow").await.unwrap_err();
        assert!(matches!(err, BridgeError::Timeout(_)));
    }
    assert_eq!(client.status().breaker_state, BreakerState::Open);

    let (result, elapsed) = timed(client.send("rejected")).await;
    assert!(matches!(result, Err(BridgeError::BreakerOpen)));
    assert!(elapsed < Duration::from_millis(50), "took {elapsed:?}");

    tokio::time::sleep(Duration::from_millis(350)).await;

    let (a, b, c) = tokio::join!(client.send("probe"), client.send("probe"), client.send("probe"));
    let results = [a, b, c];
    let ok = results.iter().filter(|r| r.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(BridgeError::BreakerOpen)))
        .count();
    assert_eq!((ok, rejected), (1, 2));
    assert_eq!(client.status().breaker_state, BreakerState::Closed);

    client.close().await.unwrap();
    let seen = server.await.unwrap();
    assert_eq!(seen, vec!["slow", "slow", "slow", "probe"]);
}

#[tokio::test]
async fn test_failed_probe_reopens_breaker() {
    let peer = MockPeer::bind().await.unwrap();
    let options = fast_options()
        .with_command_timeout(Duration::from_millis(80))
        .with_breaker(2, Duration::from_millis(200));
    let session = connect(&peer, options).await.unwrap();
    let client = session.client.clone();

    let mut conn = session.conn;
    let server = tokio::spawn(async move { while conn.recv_command().await.is_ok() {} });

    for _ in 0..2 {
        assert!(client.send("slow").await.is_err());
    }
    assert_eq!(client.status().breaker_state, BreakerState::Open);

    tokio::time::sleep(Duration::from_millis(250)).await;
    let err = client.send("probe").await.unwrap_err();
    assert!(matches!(err, BridgeError::Timeout(_)));

    assert_eq!(client.status().breaker_state, BreakerState::Open);
    assert!(matches!(client.send("again").await, Err(BridgeError::BreakerOpen)));

    client.close().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn test_reconnect_resets_breaker() {
    let peer = MockPeer::bind().await.unwrap();
    let options = fast_options()
        .with_command_timeout(Duration::from_millis(80))
        .with_breaker(2, Duration::from_secs(30));
    let mut session = connect(&peer, options).await.unwrap();
    let client = session.client.clone();

    for _ in 0..2 {
        assert!(client.send("slow").await.is_err());
    }
    assert_eq!(client.status().breaker_state, BreakerState::Open);

    session.conn.recv_command().await.unwrap();
    drop(session.conn);

    let _second = peer.accept().await.unwrap();
    assert!(wait_until(Duration::from_secs(2), || client.status().connections == 2).await);
    assert_eq!(client.status().breaker_state, BreakerState::Closed);
}
