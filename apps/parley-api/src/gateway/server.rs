//! WebSocket upgrade handler and per-connection event loop.

use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::{header, HeaderMap};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};

use crate::AppState;

use super::events::ClientEvent;
use super::lifecycle::ConnectionLifecycle;
use super::session::Session;

/// Close code sent when a client stops answering pings.
const CLOSE_SESSION_TIMEOUT: u16 = 4009;

/// Floor for the ping interval; `time::interval` rejects zero.
const MIN_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(1);

/// How long the writer may keep flushing after the session ends.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Handshake query string: `/gateway?token=...&name=...`.
#[derive(Debug, Default, Deserialize)]
pub struct HandshakeParams {
    pub token: Option<String>,
    pub name: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/gateway", get(ws_upgrade))
}

async fn ws_upgrade(
    ws: WebSocketUpgrade,
    params: Result<Query<HandshakeParams>, QueryRejection>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> impl IntoResponse {
    // A garbled query string connects anonymously instead of failing the upgrade.
    let params = match params {
        Ok(Query(params)) => params,
        Err(err) => {
            tracing::debug!(%err, "ignoring malformed handshake query");
            HandshakeParams::default()
        }
    };
    let credential = params.token.or_else(|| bearer_token(&headers));
    ws.on_upgrade(move |socket| handle_connection(socket, state, credential, params.name))
}

/// Token from an `Authorization: Bearer ...` header.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
}

async fn handle_connection(
    socket: WebSocket,
    state: AppState,
    credential: Option<String>,
    declared: Option<String>,
) {
    let (ws_tx, ws_rx) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel();
    let mut writer = tokio::spawn(writer_task(ws_tx, rx));

    let mut lifecycle = ConnectionLifecycle::new(state.router.clone(), state.identity.clone());
    let session = lifecycle
        .admit(credential.as_deref(), declared.as_deref(), tx)
        .await;

    run_session(&lifecycle, &session, ws_rx, state.config.heartbeat_interval).await;

    lifecycle.disconnect();
    drop(session);
    drop(lifecycle);

    // Every sender is gone once the session is unregistered; let the writer
    // flush what is queued, then give up.
    if time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await.is_err() {
        writer.abort();
    }
}

/// Read client frames until the socket closes or the client goes silent.
async fn run_session(
    lifecycle: &ConnectionLifecycle,
    session: &Session,
    mut ws_rx: SplitStream<WebSocket>,
    heartbeat_interval: Duration,
) {
    // Clients must show some sign of life within 1.5x the ping interval.
    let heartbeat_interval = heartbeat_interval.max(MIN_HEARTBEAT_INTERVAL);
    let idle_limit = heartbeat_interval * 3 / 2;
    let mut ping_timer = time::interval(heartbeat_interval);
    ping_timer.tick().await; // First tick fires immediately; skip it.
    let mut last_seen = Instant::now();

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        last_seen = Instant::now();
                        match ClientEvent::parse(text.as_str()) {
                            Some(event) => lifecycle.dispatch(event).await,
                            None => tracing::debug!(session_id = %session.id, "ignoring unrecognised frame"),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => last_seen = Instant::now(),
                    Some(Err(e)) => {
                        tracing::debug!(?e, session_id = %session.id, "ws read error");
                        break;
                    }
                }
            }

            _ = ping_timer.tick() => {
                if last_seen.elapsed() > idle_limit {
                    tracing::debug!(session_id = %session.id, "heartbeat timeout, closing connection");
                    session.send(close_frame(CLOSE_SESSION_TIMEOUT, "Heartbeat timeout"));
                    break;
                }
                if !session.send(Message::Ping(Default::default())) {
                    break;
                }
            }
        }
    }
}

/// Forward queued frames to the socket until the queue closes or a write fails.
async fn writer_task(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(msg) = rx.recv().await {
        let closing = matches!(msg, Message::Close(_));
        if ws_tx.send(msg).await.is_err() || closing {
            break;
        }
    }
}

fn close_frame(code: u16, reason: &str) -> Message {
    Message::Close(Some(CloseFrame {
        code,
        reason: reason.into(),
    }))
}
