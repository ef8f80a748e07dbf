mod common;

use axum_test::TestServer;
use http::StatusCode;
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// POST /api/signup
// ---------------------------------------------------------------------------

#[tokio::test]
async fn signup_returns_token_bound_to_username() {
    let (app, state) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let resp = server
        .post("/api/signup")
        .json(&json!({ "username": "Alice", "password": "correct horse" }))
        .await;

    resp.assert_status(StatusCode::CREATED);
    let body: Value = resp.json();
    assert_eq!(body["username"], "Alice");

    let token = body["token"].as_str().unwrap();
    assert_eq!(state.auth.verify(token).await.unwrap(), "Alice");
}

#[tokio::test]
async fn signup_rejects_taken_username_case_insensitively() {
    let (app, _state) = common::test_app();
    let server = TestServer::new(app).unwrap();

    server
        .post("/api/signup")
        .json(&json!({ "username": "Alice", "password": "pw-one" }))
        .await
        .assert_status(StatusCode::CREATED);

    let resp = server
        .post("/api/signup")
        .json(&json!({ "username": "alice", "password": "pw-two" }))
        .await;
    resp.assert_status(StatusCode::CONFLICT);
    let body: Value = resp.json();
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn signup_requires_username_and_password() {
    let (app, _state) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let resp = server.post("/api/signup").json(&json!({ "username": "Alice" })).await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = resp.json();
    assert_eq!(body["error"]["details"][0]["field"], "password");

    let resp = server.post("/api/signup").json(&json!({ "password": "pw" })).await;
    resp.assert_status(StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// POST /api/login
// ---------------------------------------------------------------------------

#[tokio::test]
async fn login_with_correct_password_returns_token() {
    let (app, state) = common::test_app();
    let server = TestServer::new(app).unwrap();
    state.auth.signup("Alice", "correct horse").await.unwrap();

    let resp = server
        .post("/api/login")
        .json(&json!({ "username": "alice", "password": "correct horse" }))
        .await;

    resp.assert_status_ok();
    let body: Value = resp.json();
    assert_eq!(body["username"], "Alice");
    let token = body["token"].as_str().unwrap();
    assert_eq!(state.auth.verify(token).await.unwrap(), "Alice");
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let (app, state) = common::test_app();
    let server = TestServer::new(app).unwrap();
    state.auth.signup("Alice", "correct horse").await.unwrap();

    let wrong_password = server
        .post("/api/login")
        .json(&json!({ "username": "Alice", "password": "battery staple" }))
        .await;
    wrong_password.assert_status(StatusCode::UNAUTHORIZED);

    let unknown_user = server
        .post("/api/login")
        .json(&json!({ "username": "Bob", "password": "correct horse" }))
        .await;
    unknown_user.assert_status(StatusCode::UNAUTHORIZED);

    let a: Value = wrong_password.json();
    let b: Value = unknown_user.json();
    assert_eq!(a, b);
}
