//! End-to-end session lifecycle tests against a local WebSocket fixture and
//! a wiremock HTTP backend.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use anonchat_client::room::{FixedDelayAssigner, HttpRoomAssigner, RoomAssigner};
use anonchat_client::session::SessionClient;
use anonchat_core::config::ClientConfig;
use anonchat_core::room::RoomId;
use anonchat_core::session::{ConnectionState, PollHealth};

const POLL: Duration = Duration::from_millis(25);
const WAIT: Duration = Duration::from_secs(2);

/// Minimal WebSocket server: accepts one connection, records inbound text
/// frames, closes when cancelled.
struct WsFixture {
    url: String,
    frames: mpsc::Receiver<String>,
    cancel: CancellationToken,
}

async fn ws_fixture() -> WsFixture {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let (frame_tx, frames) = mpsc::channel(16);
    let cancel = CancellationToken::new();

    let server_cancel = cancel.clone();
    tokio::spawn(async move {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
            return;
        };
        loop {
            tokio::select! {
                () = server_cancel.cancelled() => {
                    let _ = ws.close(None).await;
                    break;
                }
                msg = ws.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        let _ = frame_tx.send(text.to_string()).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    });

    WsFixture { url, frames, cancel }
}

fn config(ws_url: &str, api_url: &str) -> ClientConfig {
    ClientConfig {
        ws_url: ws_url.to_string(),
        api_url: api_url.to_string(),
        poll_interval: POLL,
        join_delay: Duration::from_millis(10),
    }
}

/// Backend with a join endpoint and a persistent message list for `room-1`.
async fn chat_backend(messages: serde_json::Value) -> wiremock::MockServer {
    let server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("POST"))
        .and(wiremock::matchers::path("/chat/join"))
        .respond_with(
            wiremock::ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"room_id": "room-1"})),
        )
        .mount(&server)
        .await;
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .and(wiremock::matchers::path("/chat/room-1/messages"))
        .respond_with(
            wiremock::ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "messages": messages })),
        )
        .mount(&server)
        .await;
    server
}

fn quick_assigner() -> Arc<dyn RoomAssigner> {
    Arc::new(FixedDelayAssigner::new(
        Duration::from_millis(10),
        RoomId::from_raw("room-1"),
    ))
}

async fn poll_request_count(server: &wiremock::MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path().ends_with("/messages"))
        .count()
}

#[tokio::test]
async fn full_flow_connect_join_poll_render() {
    let fixture = ws_fixture().await;
    let backend = chat_backend(serde_json::json!(["alice:hi there", "bob:hello:world"])).await;

    let assigner = Arc::new(HttpRoomAssigner::new(reqwest::Client::new(), backend.uri()));
    let client = SessionClient::start(config(&fixture.url, &backend.uri()), assigner)
        .await
        .unwrap();

    let mut rx = client.subscribe();
    let snap = tokio::time::timeout(WAIT, rx.wait_for(|s| !s.messages.is_empty()))
        .await
        .unwrap()
        .map(|s| s.clone())
        .unwrap();

    assert_eq!(snap.connection, ConnectionState::Connected);
    assert_eq!(snap.room_id, Some(RoomId::from_raw("room-1")));
    assert_eq!(snap.messages, vec!["hi there", "hello:world"]);
    assert_eq!(snap.poll_health, PollHealth::Healthy);
}

#[tokio::test]
async fn send_draft_transmits_exact_text_once_and_clears() {
    let mut fixture = ws_fixture().await;
    let backend = chat_backend(serde_json::json!([])).await;
    let client = SessionClient::start(config(&fixture.url, &backend.uri()), quick_assigner())
        .await
        .unwrap();

    client.set_draft("hello:with:colons");
    assert!(client.send_draft());
    assert_eq!(client.draft(), "");

    let received = tokio::time::timeout(WAIT, fixture.frames.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(received, "hello:with:colons");

    // Exactly once: nothing else arrives.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(fixture.frames.try_recv().is_err());
}

#[tokio::test]
async fn empty_draft_send_is_a_noop() {
    let mut fixture = ws_fixture().await;
    let backend = chat_backend(serde_json::json!([])).await;
    let client = SessionClient::start(config(&fixture.url, &backend.uri()), quick_assigner())
        .await
        .unwrap();

    assert!(!client.send_draft());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(fixture.frames.try_recv().is_err());
    assert_eq!(client.draft(), "");
}

#[tokio::test]
async fn send_after_disconnect_is_a_noop_and_keeps_draft() {
    let fixture = ws_fixture().await;
    let backend = chat_backend(serde_json::json!([])).await;
    let client = SessionClient::start(config(&fixture.url, &backend.uri()), quick_assigner())
        .await
        .unwrap();

    client.set_draft("unsent");
    fixture.cancel.cancel();

    let mut rx = client.subscribe();
    tokio::time::timeout(WAIT, rx.wait_for(|s| !s.connection.is_connected()))
        .await
        .unwrap()
        .unwrap();

    assert!(!client.send_draft());
    assert_eq!(client.draft(), "unsent");
}

#[tokio::test]
async fn shutdown_stops_polling_within_one_tick() {
    let fixture = ws_fixture().await;
    let backend = chat_backend(serde_json::json!(["alice:hi there"])).await;
    let client = SessionClient::start(config(&fixture.url, &backend.uri()), quick_assigner())
        .await
        .unwrap();

    let mut rx = client.subscribe();
    tokio::time::timeout(WAIT, rx.wait_for(|s| s.poll_health == PollHealth::Healthy))
        .await
        .unwrap()
        .unwrap();

    client.shutdown();
    let before = poll_request_count(&backend).await;

    tokio::time::sleep(POLL * 4).await;
    let after = poll_request_count(&backend).await;

    // At most one tick may already have been in flight.
    assert!(after <= before + 1, "polling continued: {before} -> {after}");
    assert_eq!(
        client.snapshot().connection,
        ConnectionState::Disconnected
    );
}

#[tokio::test]
async fn poll_failure_is_visible_and_recovers() {
    let fixture = ws_fixture().await;
    let backend = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .and(wiremock::matchers::path("/chat/room-1/messages"))
        .respond_with(wiremock::ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&backend)
        .await;
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .and(wiremock::matchers::path("/chat/room-1/messages"))
        .respond_with(
            wiremock::ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"messages": ["alice:back again"]})),
        )
        .mount(&backend)
        .await;

    let client = SessionClient::start(config(&fixture.url, &backend.uri()), quick_assigner())
        .await
        .unwrap();

    let mut rx = client.subscribe();
    let snap = tokio::time::timeout(WAIT, rx.wait_for(|s| s.poll_health.is_failing()))
        .await
        .unwrap()
        .map(|s| s.clone())
        .unwrap();
    assert!(matches!(snap.poll_health, PollHealth::Failing { ref reason } if reason.contains("500")));

    let snap = tokio::time::timeout(WAIT, rx.wait_for(|s| s.poll_health == PollHealth::Healthy))
        .await
        .unwrap()
        .map(|s| s.clone())
        .unwrap();
    assert_eq!(snap.messages, vec!["back again"]);
}

#[tokio::test]
async fn identical_poll_responses_publish_no_new_snapshot() {
    let fixture = ws_fixture().await;
    let backend = chat_backend(serde_json::json!(["alice:hi there"])).await;
    let client = SessionClient::start(config(&fixture.url, &backend.uri()), quick_assigner())
        .await
        .unwrap();

    let mut rx = client.subscribe();
    tokio::time::timeout(WAIT, rx.wait_for(|s| !s.messages.is_empty()))
        .await
        .unwrap()
        .unwrap();
    let _ = rx.borrow_and_update();

    // Several more ticks of the same payload: no observable change.
    tokio::time::sleep(POLL * 4).await;
    assert!(!rx.has_changed().unwrap());
    assert!(poll_request_count(&backend).await >= 2);
}

#[tokio::test]
async fn disconnect_during_acquisition_leaves_room_unset_and_poll_idle() {
    let fixture = ws_fixture().await;
    let slow = Arc::new(FixedDelayAssigner::new(
        Duration::from_secs(30),
        RoomId::from_raw("never"),
    ));
    // No HTTP backend at all: polling must never start.
    let client = SessionClient::start(config(&fixture.url, "http://127.0.0.1:1"), slow)
        .await
        .unwrap();

    fixture.cancel.cancel();

    let mut rx = client.subscribe();
    tokio::time::timeout(WAIT, rx.wait_for(|s| !s.connection.is_connected()))
        .await
        .unwrap()
        .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    let snap = client.snapshot();
    assert!(snap.room_id.is_none());
    assert_eq!(snap.poll_health, PollHealth::Idle);
}

#[tokio::test]
async fn polling_outlives_the_connection() {
    let fixture = ws_fixture().await;
    let backend = chat_backend(serde_json::json!(["alice:hi there"])).await;
    let client = SessionClient::start(config(&fixture.url, &backend.uri()), quick_assigner())
        .await
        .unwrap();

    let mut rx = client.subscribe();
    tokio::time::timeout(WAIT, rx.wait_for(|s| s.poll_health == PollHealth::Healthy))
        .await
        .unwrap()
        .unwrap();

    fixture.cancel.cancel();
    tokio::time::timeout(WAIT, rx.wait_for(|s| !s.connection.is_connected()))
        .await
        .unwrap()
        .unwrap();

    // The room stays set and the poll loop keeps running over HTTP.
    let before = poll_request_count(&backend).await;
    tokio::time::sleep(POLL * 4).await;
    let after = poll_request_count(&backend).await;
    assert!(after > before, "polling stopped with the socket: {before} -> {after}");
    assert!(client.snapshot().room_id.is_some());
}
