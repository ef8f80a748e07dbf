mod common;

use std::time::Duration;

use axum_test::TestServer;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::time;
use tokio_tungstenite::tungstenite::Message;

use parley_api::gateway::fanout::{JOIN_NOTICE, LEAVE_NOTICE};
use parley_api::gateway::responder::BOT_NAME;

const QUIET: Duration = Duration::from_millis(200);

#[tokio::test]
async fn ready_reports_declared_name_for_anonymous_clients() {
    let (addr, _state) = common::start_server().await;

    let (_ws, ready) = common::join(addr, "name=Dana").await;
    assert_eq!(ready["data"]["user"], "Dana");
    assert_eq!(ready["data"]["authenticated"], false);
    assert!(ready["data"]["sessionId"].as_str().unwrap().starts_with("ses_"));

    let (_ws, ready) = common::join(addr, "").await;
    assert_eq!(ready["data"]["user"], "Anonymous");
}

#[tokio::test]
async fn join_notice_goes_to_existing_sessions_only() {
    let (addr, state) = common::start_server().await;

    let (mut s1, _) = common::join(addr, "").await;
    let (mut s2, _) = common::join(addr, "").await;

    let notice = common::next_event(&mut s1).await;
    assert_eq!(notice["event"], "chatMessage");
    assert_eq!(notice["data"]["system"], true);
    assert_eq!(notice["data"]["text"], JOIN_NOTICE);

    common::assert_silent(&mut s2, QUIET).await;
    assert_eq!(state.router.presence().len(), 2);
}

#[tokio::test]
async fn chat_is_echoed_to_all_and_answered_by_bot() {
    let (addr, state) = common::start_server().await;

    let (mut s1, _) = common::join(addr, "").await;
    let (mut s2, _) = common::join(addr, "").await;
    common::next_event(&mut s1).await;

    common::send_event(&mut s1, "chatMessage", json!({ "user": "Alice", "text": "hello" })).await;

    for ws in [&mut s1, &mut s2] {
        let echo = common::next_event(ws).await;
        assert_eq!(echo["event"], "chatMessage");
        assert_eq!(echo["data"]["user"], "Alice");
        assert_eq!(echo["data"]["text"], "hello");
        assert!(echo["data"]["createdAt"].is_string());
    }

    for ws in [&mut s1, &mut s2] {
        let reply = common::next_event(ws).await;
        assert_eq!(reply["data"]["user"], BOT_NAME);
        assert_eq!(reply["data"]["text"], "Hi Alice! 👋 How can I help you today?");
    }

    let history = state.messages.recent(10).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].user, "Alice");
    assert_eq!(history[1].user, BOT_NAME);
}

#[tokio::test]
async fn unmatched_text_gets_no_reply() {
    let (addr, _state) = common::start_server().await;
    let (mut s1, _) = common::join(addr, "").await;

    common::send_event(&mut s1, "chatMessage", json!({ "user": "Alice", "text": "xyz" })).await;
    assert_eq!(common::next_event(&mut s1).await["data"]["text"], "xyz");
    common::assert_silent(&mut s1, QUIET).await;
}

#[tokio::test]
async fn malformed_and_unknown_frames_are_ignored() {
    let (addr, _state) = common::start_server().await;
    let (mut s1, _) = common::join(addr, "").await;

    s1.send(Message::Text("not json".into())).await.unwrap();
    common::send_event(&mut s1, "joinRoom", json!("lobby")).await;
    common::send_event(&mut s1, "chatMessage", json!({ "user": "Alice", "text": "still here" })).await;

    let echo = common::next_event(&mut s1).await;
    assert_eq!(echo["data"]["text"], "still here");
}

#[tokio::test]
async fn typing_is_relayed_to_others_only() {
    let (addr, _state) = common::start_server().await;

    let (mut s1, _) = common::join(addr, "").await;
    let (mut s2, _) = common::join(addr, "").await;
    common::next_event(&mut s1).await;

    common::send_event(&mut s2, "typing", json!("Bob")).await;
    common::send_event(&mut s2, "typing", json!("Bob")).await;
    common::send_event(&mut s2, "stopTyping", json!("Bob")).await;

    let typing = common::next_event(&mut s1).await;
    assert_eq!(typing, json!({ "event": "typing", "data": { "user": "Bob" } }));
    let stop = common::next_event(&mut s1).await;
    assert_eq!(stop, json!({ "event": "stopTyping", "data": { "user": "Bob" } }));

    common::assert_silent(&mut s1, QUIET).await;
    common::assert_silent(&mut s2, QUIET).await;
}

#[tokio::test]
async fn leave_notice_goes_to_remaining_sessions() {
    let (addr, state) = common::start_server().await;

    let (mut s1, _) = common::join(addr, "").await;
    let (mut s2, _) = common::join(addr, "").await;
    let (mut s3, _) = common::join(addr, "").await;
    common::next_event(&mut s1).await;
    common::next_event(&mut s1).await;
    common::next_event(&mut s2).await;

    s2.close(None).await.unwrap();

    for ws in [&mut s1, &mut s3] {
        let notice = common::next_event(ws).await;
        assert_eq!(notice["data"]["system"], true);
        assert_eq!(notice["data"]["text"], LEAVE_NOTICE);
    }
    common::assert_silent(&mut s1, QUIET).await;
    assert_eq!(state.router.presence().len(), 2);
}

#[tokio::test]
async fn silent_client_is_closed_and_announced() {
    let config = parley_api::config::Config {
        heartbeat_interval: Duration::from_millis(50),
        ..common::test_config()
    };
    let (addr, state) = common::start_server_with(config).await;

    let (mut s1, _) = common::join(addr, "").await;
    // Never polled after `ready`, so it never answers a ping.
    let (mut silent, _) = common::join(addr, "").await;
    assert_eq!(common::next_event(&mut s1).await["data"]["text"], JOIN_NOTICE);

    let notice = common::next_event(&mut s1).await;
    assert_eq!(notice["data"]["system"], true);
    assert_eq!(notice["data"]["text"], LEAVE_NOTICE);
    assert_eq!(state.router.presence().len(), 1);

    let close = time::timeout(Duration::from_secs(5), async {
        loop {
            match silent.next().await {
                Some(Ok(Message::Close(frame))) => return frame,
                Some(Ok(_)) => continue,
                other => panic!("unexpected ws item: {other:?}"),
            }
        }
    })
    .await
    .expect("timed out waiting for close");
    let frame = close.expect("close frame");
    assert_eq!(u16::from(frame.code), 4009);
}

#[tokio::test]
async fn malformed_handshake_query_connects_anonymously() {
    let (addr, _state) = common::start_server().await;

    let (_ws, ready) = common::join(addr, "token=a&token=b&name=Dana").await;
    assert_eq!(ready["data"]["user"], "Anonymous");
    assert_eq!(ready["data"]["authenticated"], false);
}

#[tokio::test]
async fn authenticated_session_posts_under_account_name() {
    let (addr, state) = common::start_server().await;
    let token = state.auth.signup("alice", "hunter22").await.unwrap().token;

    let (mut s1, ready) = common::join(addr, &format!("token={token}&name=Mallory")).await;
    assert_eq!(ready["data"]["user"], "alice");
    assert_eq!(ready["data"]["authenticated"], true);

    common::send_event(&mut s1, "chatMessage", json!({ "user": "Mallory", "text": "xyz" })).await;
    assert_eq!(common::next_event(&mut s1).await["data"]["user"], "alice");
}

#[tokio::test]
async fn bearer_header_is_accepted() {
    let (addr, state) = common::start_server().await;
    let token = state.auth.signup("alice", "hunter22").await.unwrap().token;

    let mut ws = common::connect_with_bearer(addr, &token).await;
    let ready = common::next_event(&mut ws).await;
    assert_eq!(ready["data"]["user"], "alice");
    assert_eq!(ready["data"]["authenticated"], true);
}

#[tokio::test]
async fn invalid_token_downgrades_to_declared_name() {
    let (addr, _state) = common::start_server().await;

    let (_ws, ready) = common::join(addr, "token=not-a-token&name=Dana").await;
    assert_eq!(ready["data"]["user"], "Dana");
    assert_eq!(ready["data"]["authenticated"], false);
}

#[tokio::test]
async fn rest_submission_reaches_gateway_sessions() {
    let (addr, state) = common::start_server().await;
    let server = TestServer::new(parley_api::routes::router().with_state(state.clone())).unwrap();

    let (mut s1, _) = common::join(addr, "").await;

    let resp = server
        .post("/api/messages")
        .json(&json!({ "user": "Eve", "text": "from rest" }))
        .await;
    resp.assert_status(http::StatusCode::CREATED);

    let echo = common::next_event(&mut s1).await;
    assert_eq!(echo["data"]["user"], "Eve");
    assert_eq!(echo["data"]["text"], "from rest");
}
