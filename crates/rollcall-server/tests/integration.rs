//! End-to-end realtime tests using real WebSocket clients.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use rollcall_server::{start, ServerConfig, ServerHandle};
use serde_json::{json, Value};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

const TIMEOUT: Duration = Duration::from_secs(5);

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn boot_server() -> ServerHandle {
    let config = ServerConfig {
        port: 0,
        ..Default::default()
    };
    start(config).await.unwrap()
}

/// Connect a listener. The server registers it before completing the handshake.
async fn connect(handle: &ServerHandle) -> WsStream {
    let (ws, _) = connect_async(format!("ws://127.0.0.1:{}/ws", handle.port))
        .await
        .unwrap();
    ws
}

async fn wait_for_clients(handle: &ServerHandle, expected: usize) {
    timeout(TIMEOUT, async {
        while handle.clients().count() != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("client registry never reached expected size");
}

/// Next text frame as JSON, skipping control frames.
async fn next_event(ws: &mut WsStream) -> Value {
    loop {
        let msg = timeout(TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for event")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

/// Assert no text frame arrives within a short window.
async fn assert_quiet(ws: &mut WsStream) {
    let quiet = timeout(Duration::from_millis(200), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => return Some(text.to_string()),
                Some(Ok(_)) => continue,
                _ => return None,
            }
        }
    })
    .await;
    assert!(
        matches!(quiet, Err(_) | Ok(None)),
        "unexpected event: {quiet:?}"
    );
}

async fn post_attendance(port: u16, body: Value) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .post(format!("http://127.0.0.1:{port}/api/attendance"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

#[tokio::test]
async fn listener_receives_each_created_record_once() {
    let handle = boot_server().await;
    let mut ws = connect(&handle).await;

    let (status, first) = post_attendance(
        handle.port,
        json!({"studentId": "S1", "timestamp": "2024-01-01T08:00:00Z", "deviceId": "D1"}),
    )
    .await;
    assert_eq!(status, 201);
    let (status, second) = post_attendance(
        handle.port,
        json!({"studentId": "S2", "timestamp": "2024-01-01T08:05:00Z"}),
    )
    .await;
    assert_eq!(status, 201);

    let event = next_event(&mut ws).await;
    assert_eq!(event["event"], "new-attendance");
    assert_eq!(event["data"], first["data"]);

    let event = next_event(&mut ws).await;
    assert_eq!(event["event"], "new-attendance");
    assert_eq!(event["data"], second["data"]);

    assert_quiet(&mut ws).await;

    ws.close(None).await.ok();
    handle.shutdown().await;
}

#[tokio::test]
async fn rejected_posts_are_not_broadcast() {
    let handle = boot_server().await;
    let mut ws = connect(&handle).await;

    let (status, _) = post_attendance(handle.port, json!({"studentId": "S1"})).await;
    assert_eq!(status, 400);

    assert_quiet(&mut ws).await;

    ws.close(None).await.ok();
    handle.shutdown().await;
}

#[tokio::test]
async fn every_listener_gets_the_event() {
    let handle = boot_server().await;
    let mut a = connect(&handle).await;
    let mut b = connect(&handle).await;

    let (_, created) = post_attendance(
        handle.port,
        json!({"studentId": "S7", "timestamp": "2024-01-01T10:00:00Z"}),
    )
    .await;

    assert_eq!(next_event(&mut a).await["data"], created["data"]);
    assert_eq!(next_event(&mut b).await["data"], created["data"]);

    a.close(None).await.ok();
    b.close(None).await.ok();
    handle.shutdown().await;
}

#[tokio::test]
async fn late_listener_gets_no_replay() {
    let handle = boot_server().await;

    let (status, _) = post_attendance(
        handle.port,
        json!({"studentId": "S1", "timestamp": "2024-01-01T08:00:00Z"}),
    )
    .await;
    assert_eq!(status, 201);

    let mut ws = connect(&handle).await;
    assert_quiet(&mut ws).await;

    let (_, created) = post_attendance(
        handle.port,
        json!({"studentId": "S2", "timestamp": "2024-01-01T08:01:00Z"}),
    )
    .await;
    let event = next_event(&mut ws).await;
    assert_eq!(event["data"]["id"], 2);
    assert_eq!(event["data"], created["data"]);

    ws.close(None).await.ok();
    handle.shutdown().await;
}

#[tokio::test]
async fn client_messages_are_ignored_and_disconnect_unregisters() {
    let handle = boot_server().await;
    let mut ws = connect(&handle).await;

    ws.send(Message::Text("hello".into())).await.unwrap();
    assert_quiet(&mut ws).await;
    assert_eq!(handle.clients().count(), 1);

    ws.close(None).await.unwrap();
    drop(ws);
    wait_for_clients(&handle, 0).await;

    handle.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn listener_is_live_as_soon_as_handshake_completes() {
    let handle = boot_server().await;
    let url = format!("ws://127.0.0.1:{}/ws", handle.port);

    for round in 0..50 {
        let (mut ws, _) = connect_async(url.as_str()).await.unwrap();

        let (status, created) = post_attendance(
            handle.port,
            json!({"studentId": format!("S{round}"), "timestamp": "2024-01-01T08:00:00Z"}),
        )
        .await;
        assert_eq!(status, 201);

        let event = next_event(&mut ws).await;
        assert_eq!(event["data"], created["data"], "round {round}");

        ws.close(None).await.ok();
    }

    handle.shutdown().await;
}
