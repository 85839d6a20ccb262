use crate::broker::Broker;
use crate::config::Settings;
use crate::transport::message::{Envelope, Role, TransmissionMode};
use crate::transport::websocket::{serve, start_websocket_server};
use crate::utils::BrokerError;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tungstenite::protocol::Message as WsMessage;

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn setup_server() -> (String, Arc<Broker>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("local_addr");
    let broker = Arc::new(Broker::new());

    tokio::spawn(serve(listener, broker.clone(), Settings::default()));

    (format!("ws://{addr}"), broker)
}

async fn connect(url: &str) -> Ws {
    let (ws, _) = connect_async(url)
        .await
        .expect("WebSocket handshake failed");
    ws
}

async fn send(ws: &mut Ws, value: serde_json::Value) {
    ws.send(WsMessage::text(value.to_string()))
        .await
        .expect("Failed to send frame");
}

async fn next_text(ws: &mut Ws) -> String {
    let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("Timed out waiting for a frame")
        .expect("Stream ended")
        .expect("Read error");
    match msg {
        WsMessage::Text(text) => text.as_str().to_string(),
        other => panic!("Expected a text message, got {other:?}"),
    }
}

async fn expect_silence(ws: &mut Ws) {
    let res = tokio::time::timeout(Duration::from_millis(200), ws.next()).await;
    assert!(res.is_err(), "Expected no frame, got {res:?}");
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}

#[tokio::test]
async fn test_buffered_message_is_pulled_once() {
    let (url, broker) = setup_server().await;
    let mut producer = connect(&url).await;
    let mut consumer = connect(&url).await;

    send(
        &mut producer,
        json!({
            "role": "producer",
            "topic": "orders",
            "transmissionMode": "buffered",
            "message": "order-1"
        }),
    )
    .await;
    wait_until(|| broker.queue_len("orders") == 1).await;

    let pull = json!({"role": "consumer", "topic": "orders", "subscribe": false});
    send(&mut consumer, pull.clone()).await;
    let payload: String = serde_json::from_str(&next_text(&mut consumer).await).unwrap();
    assert_eq!(payload, "order-1");

    send(&mut consumer, pull).await;
    expect_silence(&mut consumer).await;
    assert_eq!(broker.queue_len("orders"), 0);

    // the producer never hears back for an enqueue
    expect_silence(&mut producer).await;
}

#[tokio::test]
async fn test_buffered_messages_keep_fifo_order() {
    let (url, broker) = setup_server().await;
    let mut producer = connect(&url).await;
    let mut consumer = connect(&url).await;

    for message in ["A", "B", "C"] {
        send(
            &mut producer,
            json!({
                "role": "producer",
                "topic": "orders",
                "transmissionMode": "buffered",
                "message": message
            }),
        )
        .await;
    }
    wait_until(|| broker.queue_len("orders") == 3).await;

    for expected in ["\"A\"", "\"B\"", "\"C\""] {
        send(&mut consumer, json!({"role": "consumer", "topic": "orders"})).await;
        assert_eq!(next_text(&mut consumer).await, expected);
    }
}

#[tokio::test]
async fn test_broadcast_reaches_only_subscribers() {
    let (url, broker) = setup_server().await;
    let mut subscriber = connect(&url).await;
    let mut bystander = connect(&url).await;
    let mut producer = connect(&url).await;

    send(
        &mut subscriber,
        json!({"role": "consumer", "topic": "alerts", "subscribe": true}),
    )
    .await;
    wait_until(|| broker.subscriber_count("alerts") == 1).await;

    send(
        &mut producer,
        json!({
            "role": "producer",
            "topic": "alerts",
            "transmissionMode": "broadcast",
            "message": "fire"
        }),
    )
    .await;

    let forwarded: Envelope = serde_json::from_str(&next_text(&mut subscriber).await).unwrap();
    assert_eq!(forwarded.role, Role::Producer);
    assert_eq!(forwarded.topic, "alerts");
    assert_eq!(forwarded.transmission_mode, TransmissionMode::Broadcast);
    assert_eq!(forwarded.message, "fire");

    expect_silence(&mut bystander).await;
    expect_silence(&mut producer).await;
}

#[tokio::test]
async fn test_disconnected_subscriber_is_removed() {
    let (url, broker) = setup_server().await;
    let mut leaving = connect(&url).await;
    let mut staying = connect(&url).await;
    let mut producer = connect(&url).await;

    let subscribe = json!({"role": "consumer", "topic": "alerts", "subscribe": true});
    send(&mut leaving, subscribe.clone()).await;
    send(&mut staying, subscribe).await;
    wait_until(|| broker.subscriber_count("alerts") == 2).await;

    leaving.close(None).await.expect("Failed to close WebSocket");
    wait_until(|| broker.subscriber_count("alerts") == 1).await;
    assert_eq!(broker.subscribed_connections(), 1);

    send(
        &mut producer,
        json!({
            "role": "producer",
            "topic": "alerts",
            "transmissionMode": "broadcast",
            "message": "still here"
        }),
    )
    .await;

    let forwarded: Envelope = serde_json::from_str(&next_text(&mut staying).await).unwrap();
    assert_eq!(forwarded.message, "still here");
}

#[tokio::test]
async fn test_dropped_socket_is_cleaned_up() {
    let (url, broker) = setup_server().await;
    let mut consumer = connect(&url).await;

    send(
        &mut consumer,
        json!({"role": "consumer", "topic": "alerts", "subscribe": true}),
    )
    .await;
    wait_until(|| broker.subscriber_count("alerts") == 1).await;

    // no closing handshake
    drop(consumer);
    wait_until(|| broker.subscriber_count("alerts") == 0).await;
    assert_eq!(broker.subscribed_connections(), 0);
}

#[tokio::test]
async fn test_bad_frames_do_not_close_the_connection() {
    let (url, broker) = setup_server().await;
    let mut client = connect(&url).await;

    client
        .send(WsMessage::text("definitely not json"))
        .await
        .unwrap();
    send(&mut client, json!({"role": "spectator", "topic": "orders"})).await;
    send(
        &mut client,
        json!({"role": "producer", "topic": "orders", "transmissionMode": "someday"}),
    )
    .await;
    expect_silence(&mut client).await;

    send(
        &mut client,
        json!({
            "role": "producer",
            "topic": "orders",
            "transmissionMode": "buffered",
            "message": "order-2"
        }),
    )
    .await;
    send(&mut client, json!({"role": "consumer", "topic": "orders"})).await;

    assert_eq!(next_text(&mut client).await, "\"order-2\"");
    assert_eq!(broker.queue_len("orders"), 0);
}

#[tokio::test]
async fn test_bind_failure_is_reported() {
    let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = taken.local_addr().unwrap().to_string();

    let res = start_websocket_server(addr.clone(), Arc::new(Broker::new()), Settings::default())
        .await;

    match res {
        Err(BrokerError::Bind { addr: reported, .. }) => assert_eq!(reported, addr),
        other => panic!("Expected a bind error, got {other:?}"),
    }
}
