//! Gateway Integration Tests
//!
//! Each test starts its own in-process gateway on an ephemeral port.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use integration_tests::{kind, test_config, TestServer};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message;

// ============================================================================
// HTTP Endpoints
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await.expect("Failed to start server");
    let response = server.get("/health").await.expect("Request failed");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_stats_count_connections() {
    let server = TestServer::start().await.expect("Failed to start server");
    let (mut alice, _) = server.connect_as("alice", None).await.unwrap();
    alice.until_pong().await.unwrap();

    let stats: Value = server.get("/stats").await.unwrap().json().await.unwrap();
    assert_eq!(stats["connections"], 1);
    assert_eq!(stats["users"], 1);
    assert_eq!(stats["sessions"], 1);
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_auth_success_identifies_connection() {
    let server = TestServer::start().await.expect("Failed to start server");
    let (_alice, success) = server.connect_as("alice", Some("s-1")).await.unwrap();

    assert_eq!(success["user_id"], "alice");
    assert_eq!(success["session_id"], "s-1");
    assert_eq!(success["resumed"], false);
    assert!(success["connection_id"].is_number() || success["connection_id"].is_string());
}

#[tokio::test]
async fn test_auth_retry_limit_closes_connection() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut client = server.connect().await.unwrap();

    for _ in 0..3 {
        client.auth("not-a-token", None).await.unwrap();
    }
    for _ in 0..3 {
        let error = client.recv_of("error").await.unwrap();
        assert_eq!(error["data"]["code"], "auth_failed");
    }
    assert_eq!(client.expect_close().await.unwrap(), 4004);
}

#[tokio::test]
async fn test_request_before_auth_is_rejected() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut client = server.connect().await.unwrap();

    client.send("join", json!({ "room": "lobby" })).await.unwrap();
    let error = client.recv_of("error").await.unwrap();
    assert_eq!(error["data"]["code"], "not_authenticated");

    // Still allowed to authenticate afterwards
    client
        .auth(&server.token("alice").unwrap(), None)
        .await
        .unwrap();
    client.recv_of("auth_success").await.unwrap();
}

#[tokio::test]
async fn test_auth_timeout_closes_connection() {
    let mut config = test_config();
    config.realtime.auth_timeout_secs = 1;
    let server = TestServer::start_with_config(config).await.unwrap();

    let mut client = server.connect().await.unwrap();
    assert_eq!(client.expect_close().await.unwrap(), 4005);
}

#[tokio::test]
async fn test_binary_frame_closes_with_decode_error() {
    let server = TestServer::start().await.expect("Failed to start server");
    let (mut alice, _) = server.connect_as("alice", None).await.unwrap();

    alice
        .send_raw(Message::Binary(vec![1, 2, 3]))
        .await
        .unwrap();
    assert_eq!(alice.expect_close().await.unwrap(), 4002);
}

// ============================================================================
// Dispatch
// ============================================================================

#[tokio::test]
async fn test_unknown_kind_keeps_connection_open() {
    let server = TestServer::start().await.expect("Failed to start server");
    let (mut alice, _) = server.connect_as("alice", None).await.unwrap();

    alice.send("teleport", json!({})).await.unwrap();
    let error = alice.recv_of("error").await.unwrap();
    assert_eq!(error["data"]["code"], "unknown_kind");

    alice.until_pong().await.unwrap();
}

#[tokio::test]
async fn test_room_broadcast_excludes_sender() {
    let server = TestServer::start().await.expect("Failed to start server");
    let (mut alice, _) = server.connect_as("alice", None).await.unwrap();
    let (mut bob, _) = server.connect_as("bob", None).await.unwrap();
    let (mut carol, _) = server.connect_as("carol", None).await.unwrap();

    for client in [&mut alice, &mut bob, &mut carol] {
        client.send("join", json!({ "room": "lobby" })).await.unwrap();
        client.recv_of("ack").await.unwrap();
    }

    alice
        .send("chat", json!({ "room": "lobby", "content": "hi all" }))
        .await
        .unwrap();
    let ack = alice.recv_of("ack").await.unwrap();
    assert_eq!(ack["data"]["delivered"], 2);

    for client in [&mut bob, &mut carol] {
        let message = client.recv_of("message").await.unwrap();
        assert_eq!(message["data"]["content"], "hi all");
        assert_eq!(message["data"]["from"], "alice");
    }

    let seen = alice.until_pong().await.unwrap();
    assert!(seen.iter().all(|env| kind(env) != "message"));
}

#[tokio::test]
async fn test_typing_reaches_other_members() {
    let server = TestServer::start().await.expect("Failed to start server");
    let (mut alice, _) = server.connect_as("alice", None).await.unwrap();
    let (mut bob, _) = server.connect_as("bob", None).await.unwrap();

    for client in [&mut alice, &mut bob] {
        client.send("join", json!({ "room": "lobby" })).await.unwrap();
        client.recv_of("ack").await.unwrap();
    }

    alice
        .send("typing_start", json!({ "room": "lobby" }))
        .await
        .unwrap();
    let typing = bob.recv_of("typing").await.unwrap();
    assert_eq!(typing["data"]["user_id"], "alice");
    assert_eq!(typing["data"]["typing"], true);

    // Disconnecting stops typing
    alice.close().await.unwrap();
    let typing = bob.recv_of("typing").await.unwrap();
    assert_eq!(typing["data"]["typing"], false);
}

// ============================================================================
// Presence and Offline Delivery
// ============================================================================

#[tokio::test]
async fn test_presence_follows_last_connection() {
    let server = TestServer::start().await.expect("Failed to start server");
    let (mut bob, _) = server.connect_as("bob", None).await.unwrap();
    let (alice_one, _) = server.connect_as("alice", None).await.unwrap();

    let online = bob.recv_of("presence_update").await.unwrap();
    assert_eq!(online["data"]["user_id"], "alice");
    assert_eq!(online["data"]["status"], "online");

    let (alice_two, _) = server.connect_as("alice", None).await.unwrap();
    alice_one.close().await.unwrap();

    // Still online through the second tab
    let seen = bob.until_pong().await.unwrap();
    assert!(seen.iter().all(|env| kind(env) != "presence_update"));

    alice_two.close().await.unwrap();
    let offline = bob.recv_of("presence_update").await.unwrap();
    assert_eq!(offline["data"]["user_id"], "alice");
    assert_eq!(offline["data"]["status"], "offline");
}

#[tokio::test]
async fn test_direct_message_queued_and_replayed() {
    let server = TestServer::start().await.expect("Failed to start server");
    let (mut alice, _) = server.connect_as("alice", None).await.unwrap();

    for text in ["first", "second"] {
        alice
            .send("chat", json!({ "to": "bob", "content": text }))
            .await
            .unwrap();
        let ack = alice.recv_of("ack").await.unwrap();
        assert_eq!(ack["data"]["queued"], true);
    }

    let (mut bob, _) = server.connect_as("bob", None).await.unwrap();
    let first = bob.recv().await.unwrap();
    let second = bob.recv().await.unwrap();
    assert_eq!(first["data"]["content"], "first");
    assert_eq!(second["data"]["content"], "second");

    // Drained once
    let (mut bob_again, _) = server.connect_as("bob", None).await.unwrap();
    let seen = bob_again.until_pong().await.unwrap();
    assert!(seen.iter().all(|env| kind(env) != "message"));
}

// ============================================================================
// Sessions
// ============================================================================

#[tokio::test]
async fn test_session_reattachment_keeps_history_and_context() {
    let server = TestServer::start().await.expect("Failed to start server");
    let (mut alice, _) = server.connect_as("alice", Some("study")).await.unwrap();

    alice
        .send("context", json!({ "kind": "quote", "id": "Q-42" }))
        .await
        .unwrap();
    alice.recv_of("context_updated").await.unwrap();
    alice.close().await.unwrap();

    let (mut alice, success) = server.connect_as("alice", Some("study")).await.unwrap();
    assert_eq!(success["resumed"], true);
    assert_eq!(success["context"]["id"], "Q-42");

    alice.send("history", json!({})).await.unwrap();
    let history = alice.recv_of("history").await.unwrap();
    assert!(!history["data"]["messages"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_foreign_session_is_refused() {
    let server = TestServer::start().await.expect("Failed to start server");
    let (_alice, _) = server.connect_as("alice", Some("private")).await.unwrap();

    let mut mallory = server.connect().await.unwrap();
    mallory
        .auth(&server.token("mallory").unwrap(), Some("private"))
        .await
        .unwrap();
    let error = mallory.recv_of("error").await.unwrap();
    assert_eq!(error["data"]["code"], "session_conflict");
}
