//! Relay end-to-end tests
//!
//! The relay runs against a scripted peer with an in-memory chat sink.
//!
//! Run with: cargo test -p integration-tests --test relay_tests

use std::sync::Arc;
use std::time::Duration;

use bridge_client::{BridgeClient, Topic};
use bridge_common::RelaySettings;
use bridge_relay::{
    operator_loop, ActionId, ActionKind, CommandRegistry, MemorySink, Relay, SinkRecord,
};
use integration_tests::{fast_options, wait_until, MockPeer, PeerConn};
use tokio::io::{AsyncReadExt, BufReader};
use tokio_util::sync::CancellationToken;

struct Harness {
    relay: Relay,
    sink: MemorySink,
    conn: PeerConn,
    shutdown: CancellationToken,
}

async fn start_relay(peer: &MockPeer, status_channel: Option<&str>) -> Harness {
    let sink = MemorySink::new();
    let relay = Relay::new(
        Arc::new(BridgeClient::new(peer.addr(), fast_options())),
        CommandRegistry::with_builtins(),
        Arc::new(sink.clone()),
        RelaySettings {
            chat_prefix: "[Discord]".to_string(),
            channel_id: Some("chat".to_string()),
            status_channel_id: status_channel.map(str::to_string),
        },
    );

    let shutdown = CancellationToken::new();
    relay.client().start(shutdown.child_token());
    let conn = peer.accept().await.unwrap();

    let client = relay.client();
    assert!(wait_until(Duration::from_secs(2), || client.is_connected()).await);

    Harness {
        relay,
        sink,
        conn,
        shutdown,
    }
}

// ============================================================================
// Commands
// ============================================================================

#[tokio::test]
async fn test_whitelist_command_reaches_peer() {
    let peer = MockPeer::bind().await.unwrap();
    let mut h = start_relay(&peer, None).await;

    let conn = &mut h.conn;
    let (reply, _) = tokio::join!(h.relay.handle_input("/whitelist Steve"), async {
        let (id, body) = conn.recv_command().await.unwrap();
        assert_eq!(&body[..], b"whitelist add Steve");
        conn.respond(&id, "Added Steve to the whitelist").await.unwrap();
    });

    assert_eq!(reply.unwrap().as_deref(), Some("Added Steve to the whitelist"));
}

#[tokio::test]
async fn test_approve_action_whitelists_subject() {
    let peer = MockPeer::bind().await.unwrap();
    let mut h = start_relay(&peer, None).await;
    let action = ActionId::new(ActionKind::Approve, "Alex_99", "1234").encode().unwrap();

    let conn = &mut h.conn;
    let (reply, _) = tokio::join!(h.relay.handle_action(&action), async {
        let (id, body) = conn.recv_command().await.unwrap();
        assert_eq!(&body[..], b"whitelist add Alex_99");
        conn.respond(&id, "ok").await.unwrap();
    });

    assert_eq!(reply.unwrap().as_deref(), Some("ok"));
}

#[tokio::test]
async fn test_chat_is_relayed_with_prefix() {
    let peer = MockPeer::bind().await.unwrap();
    let mut h = start_relay(&peer, None).await;

    let conn = &mut h.conn;
    let (result, _) = tokio::join!(h.relay.handle_input("bob: hello there"), async {
        let (id, body) = conn.recv_command().await.unwrap();
        assert_eq!(&body[..], b"say [Discord] bob: hello there");
        conn.respond(&id, "").await.unwrap();
    });

    assert!(result.unwrap().is_none());
}

#[tokio::test]
async fn test_remote_error_surfaces_to_operator() {
    let peer = MockPeer::bind().await.unwrap();
    let mut h = start_relay(&peer, None).await;

    let conn = &mut h.conn;
    let (result, _) = tokio::join!(h.relay.handle_input("/kick Nobody"), async {
        let (id, _) = conn.recv_command().await.unwrap();
        conn.fail(&id, "no such player").await.unwrap();
    });

    let err = result.unwrap_err();
    assert_eq!(err.error_code(), "REMOTE_ERROR");
    assert!(err.to_string().contains("no such player"));
}

#[tokio::test]
async fn test_operator_loop_reports_each_line() {
    let peer = MockPeer::bind().await.unwrap();
    let mut h = start_relay(&peer, None).await;

    let input = BufReader::new(&b"/kick Alex\n/fly\n\n"[..]);
    let (output, mut captured) = tokio::io::duplex(4096);

    let conn = &mut h.conn;
    let (result, _) = tokio::join!(operator_loop(&h.relay, input, output), async {
        let (id, body) = conn.recv_command().await.unwrap();
        assert_eq!(&body[..], b"kick Alex");
        conn.respond(&id, "Kicked Alex").await.unwrap();
    });
    result.unwrap();

    let mut text = String::new();
    captured.read_to_string(&mut text).await.unwrap();
    assert_eq!(text, "Kicked Alex\nerror [UNKNOWN_COMMAND]: Unknown command: fly\n");
}

// ============================================================================
// Events
// ============================================================================

#[tokio::test]
async fn test_events_are_routed_to_sink() {
    let peer = MockPeer::bind().await.unwrap();
    let mut h = start_relay(&peer, Some("status")).await;

    let router = tokio::spawn(
        h.relay
            .event_router()
            .run(h.relay.client().subscribe(0), h.shutdown.clone()),
    );

    h.conn.event(Topic::Chat, "<Steve> literal{hi}").await.unwrap();
    h.conn.event(Topic::Join, "Alex joined the game").await.unwrap();
    h.conn.event("weather", "rain").await.unwrap();
    h.conn.event(Topic::Status, "2/20 players").await.unwrap();

    let records = tokio::time::timeout(Duration::from_secs(2), h.sink.wait_for(4))
        .await
        .unwrap();
    assert_eq!(
        records,
        vec![
            SinkRecord::Message {
                channel: Some("chat".to_string()),
                text: "<Steve> hi".to_string(),
            },
            SinkRecord::Message {
                channel: Some("chat".to_string()),
                text: "Alex joined the game".to_string(),
            },
            SinkRecord::Presence("2/20 players".to_string()),
            SinkRecord::Rename {
                channel: "status".to_string(),
                name: "🟢 2/20 players".to_string(),
            },
        ]
    );

    h.shutdown.cancel();
    assert_eq!(router.await.unwrap(), 3);
}

#[tokio::test]
async fn test_router_survives_reconnect() {
    let peer = MockPeer::bind().await.unwrap();
    let h = start_relay(&peer, None).await;

    let router = tokio::spawn(
        h.relay
            .event_router()
            .run(h.relay.client().subscribe(0), h.shutdown.clone()),
    );

    drop(h.conn);
    let mut second = peer.accept().await.unwrap();
    let client = h.relay.client();
    assert!(wait_until(Duration::from_secs(2), || client.status().connections == 2).await);

    second.event(Topic::Lifecycle, "Server started").await.unwrap();
    let records = tokio::time::timeout(Duration::from_secs(2), h.sink.wait_for(1))
        .await
        .unwrap();
    assert_eq!(
        records,
        vec![SinkRecord::Message {
            channel: Some("chat".to_string()),
            text: "Server started".to_string(),
        }]
    );

    h.relay.client().close().await.unwrap();
    assert_eq!(router.await.unwrap(), 1);
}
