#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::time;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use parley_api::config::Config;
use parley_api::AppState;

pub const TEST_JWT_SECRET: &str = "parley-test-secret";

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long a client waits for an expected frame.
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration with a short bot delay so gateway tests stay quick.
pub fn test_config() -> Config {
    Config {
        bot_reply_delay: Duration::from_millis(50),
        ..Config::in_memory(TEST_JWT_SECRET)
    }
}

/// Build a test AppState on in-memory stores.
pub fn test_state() -> AppState {
    AppState::in_memory(test_config())
}

/// Build the full application router wired to the test state.
pub fn test_app() -> (Router, AppState) {
    test_app_with(test_config())
}

pub fn test_app_with(config: Config) -> (Router, AppState) {
    let state = AppState::in_memory(config);
    let app = parley_api::routes::router().with_state(state.clone());
    (app, state)
}

/// Start an actual TCP server for WebSocket testing. The server runs in the
/// background for the rest of the test.
pub async fn start_server() -> (SocketAddr, AppState) {
    start_server_with(test_config()).await
}

pub async fn start_server_with(config: Config) -> (SocketAddr, AppState) {
    let (app, state) = test_app_with(config);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, state)
}

/// Open a gateway connection with the given query string (`token=...&name=...`).
pub async fn connect(addr: SocketAddr, query: &str) -> WsClient {
    let url = format!("ws://{addr}/gateway?{query}");
    let (ws, _) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("ws connect");
    ws
}

/// Open a gateway connection presenting `token` as a bearer header.
pub async fn connect_with_bearer(addr: SocketAddr, token: &str) -> WsClient {
    let mut request = format!("ws://{addr}/gateway")
        .into_client_request()
        .expect("client request");
    request
        .headers_mut()
        .insert("Authorization", format!("Bearer {token}").parse().unwrap());
    let (ws, _) = tokio_tungstenite::connect_async(request)
        .await
        .expect("ws connect");
    ws
}

/// Connect and consume the `ready` frame.
pub async fn join(addr: SocketAddr, query: &str) -> (WsClient, Value) {
    let mut ws = connect(addr, query).await;
    let ready = next_event(&mut ws).await;
    assert_eq!(ready["event"], "ready");
    (ws, ready)
}

pub async fn send_event(ws: &mut WsClient, event: &str, data: Value) {
    let frame = serde_json::json!({ "event": event, "data": data });
    ws.send(Message::Text(frame.to_string().into()))
        .await
        .expect("ws send");
}

/// Next JSON text frame, skipping control frames.
pub async fn next_event(ws: &mut WsClient) -> Value {
    time::timeout(RECV_TIMEOUT, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    return serde_json::from_str(text.as_str()).expect("json frame");
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                other => panic!("unexpected ws item: {other:?}"),
            }
        }
    })
    .await
    .expect("timed out waiting for gateway event")
}

/// Assert that no text frame arrives within `window`.
pub async fn assert_silent(ws: &mut WsClient, window: Duration) {
    let result = time::timeout(window, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                other => return other,
            }
        }
    })
    .await;
    if let Ok(frame) = result {
        panic!("expected silence, got {frame:?}");
    }
}
