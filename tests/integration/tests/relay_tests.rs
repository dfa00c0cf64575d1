//! Relay integration tests
//!
//! Each test runs a full relay on loopback ports with an in-memory identity
//! provider.
//!
//! Run with: cargo test -p integration-tests --test relay_tests

use bridge_gateway::ConnectionKind;
use futures_util::SinkExt;
use integration_tests::{assert_silent, recv_json, recv_message, TestServer};
use reqwest::StatusCode;
use serde_json::json;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

// ============================================================================
// Relay Tests
// ============================================================================

#[tokio::test]
async fn test_relay_round_trip() {
    let server = TestServer::start().await.expect("Failed to start server");
    let token = server.session_token("steve").unwrap();

    let mut g1 = server.connect_game().await.unwrap();
    let mut g2 = server.connect_game().await.unwrap();
    let mut o1 = server.connect_operator(&token).await.unwrap();

    g1.send(Message::Text("hello".into())).await.unwrap();
    assert_eq!(
        recv_json(&mut o1).await.unwrap(),
        json!({"event": "mc-event", "data": "hello"})
    );
    assert_silent(&mut g1).await.unwrap();
    assert_silent(&mut g2).await.unwrap();

    o1.send(Message::Text(r#"{"event":"command","data":"stop"}"#.into()))
        .await
        .unwrap();
    assert_eq!(recv_json(&mut g1).await.unwrap(), json!({"command": "stop"}));
    assert_eq!(recv_json(&mut g2).await.unwrap(), json!({"command": "stop"}));
    assert_silent(&mut o1).await.unwrap();

    g2.close(None).await.unwrap();
    server.wait_for_count(ConnectionKind::Game, 1).await.unwrap();

    o1.send(Message::Text(r#"{"event":"command","data":"go"}"#.into()))
        .await
        .unwrap();
    assert_eq!(recv_json(&mut g1).await.unwrap(), json!({"command": "go"}));
}

#[tokio::test]
async fn test_structured_command_is_wrapped_unchanged() {
    let server = TestServer::start().await.expect("Failed to start server");
    let token = server.session_token("alex").unwrap();
    let mut game = server.connect_game().await.unwrap();
    let mut operator = server.connect_operator(&token).await.unwrap();

    let command = json!({"say": "hi", "targets": ["@a"], "times": 2});
    operator
        .send(Message::Text(
            json!({"event": "command", "data": command}).to_string(),
        ))
        .await
        .unwrap();

    assert_eq!(recv_json(&mut game).await.unwrap(), json!({"command": command}));
}

#[tokio::test]
async fn test_game_message_reaches_every_operator() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut game = server.connect_game().await.unwrap();

    let mut operators = Vec::new();
    for name in ["a", "b", "c"] {
        let token = server.session_token(name).unwrap();
        operators.push(server.connect_operator(&token).await.unwrap());
    }

    let payload = r#"{"type":"chat","player":"Alex","msg":"gg"}"#;
    game.send(Message::Text(payload.into())).await.unwrap();

    for operator in &mut operators {
        let event = recv_json(operator).await.unwrap();
        assert_eq!(event["event"], "mc-event");
        assert_eq!(event["data"], payload);
    }
}

#[tokio::test]
async fn test_binary_game_message() {
    let server = TestServer::start().await.expect("Failed to start server");
    let token = server.session_token("steve").unwrap();
    let mut game = server.connect_game().await.unwrap();
    let mut operator = server.connect_operator(&token).await.unwrap();

    game.send(Message::Binary(vec![0xde, 0xad, 0xbe, 0xef]))
        .await
        .unwrap();

    assert_eq!(
        recv_json(&mut operator).await.unwrap(),
        json!({"event": "mc-event", "data": "3q2+7w==", "binary": true})
    );
}

#[tokio::test]
async fn test_messages_from_one_source_keep_order() {
    let server = TestServer::start().await.expect("Failed to start server");
    let token = server.session_token("steve").unwrap();
    let mut game = server.connect_game().await.unwrap();
    let mut operator = server.connect_operator(&token).await.unwrap();

    for i in 0..50 {
        game.send(Message::Text(i.to_string())).await.unwrap();
    }

    for i in 0..50 {
        let event = recv_json(&mut operator).await.unwrap();
        assert_eq!(event["data"], i.to_string());
    }
}

#[tokio::test]
async fn test_unknown_operator_event_ignored() {
    let server = TestServer::start().await.expect("Failed to start server");
    let token = server.session_token("steve").unwrap();
    let mut game = server.connect_game().await.unwrap();
    let mut operator = server.connect_operator(&token).await.unwrap();

    operator
        .send(Message::Text(r#"{"event":"reboot","data":1}"#.into()))
        .await
        .unwrap();
    operator.send(Message::Text("not json".into())).await.unwrap();
    operator
        .send(Message::Text(r#"{"event":"command","data":"list"}"#.into()))
        .await
        .unwrap();

    assert_eq!(recv_json(&mut game).await.unwrap(), json!({"command": "list"}));
    assert_silent(&mut game).await.unwrap();
    assert_eq!(server.state.registry().operator_count(), 1);
}

#[tokio::test]
async fn test_no_operators_connected() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut game = server.connect_game().await.unwrap();

    game.send(Message::Text("lonely".into())).await.unwrap();
    assert_silent(&mut game).await.unwrap();
    assert_eq!(server.state.registry().game_count(), 1);
}

// ============================================================================
// Connection Lifecycle Tests
// ============================================================================

#[tokio::test]
async fn test_operator_disconnect_leaves_others_served() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut game = server.connect_game().await.unwrap();
    let mut staying = server
        .connect_operator(&server.session_token("stay").unwrap())
        .await
        .unwrap();
    let leaving = server
        .connect_operator(&server.session_token("leave").unwrap())
        .await
        .unwrap();

    drop(leaving);
    server
        .wait_for_count(ConnectionKind::Operator, 1)
        .await
        .unwrap();

    game.send(Message::Text("still here".into())).await.unwrap();
    assert_eq!(recv_json(&mut staying).await.unwrap()["data"], "still here");

    // The game side is untouched by operator churn
    staying
        .send(Message::Text(r#"{"event":"command","data":"ok"}"#.into()))
        .await
        .unwrap();
    assert_eq!(recv_json(&mut game).await.unwrap(), json!({"command": "ok"}));
}

#[tokio::test]
async fn test_game_disconnect_unregisters() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut game = server.connect_game().await.unwrap();

    game.close(None).await.unwrap();
    server.wait_for_count(ConnectionKind::Game, 0).await.unwrap();

    // The server answers the close instead of resetting the connection
    assert!(matches!(
        recv_message(&mut game).await.unwrap(),
        Message::Close(_)
    ));
}

#[tokio::test]
async fn test_operator_close_handshake_completes() {
    let server = TestServer::start().await.expect("Failed to start server");
    let token = server.session_token("steve").unwrap();
    let mut operator = server.connect_operator(&token).await.unwrap();

    operator.close(None).await.unwrap();
    server
        .wait_for_count(ConnectionKind::Operator, 0)
        .await
        .unwrap();

    assert!(matches!(
        recv_message(&mut operator).await.unwrap(),
        Message::Close(_)
    ));
}

#[tokio::test]
async fn test_silent_tcp_peer_is_dropped() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut stream = TcpStream::connect(server.game_addr).await.unwrap();

    // No upgrade request is ever sent; the server gives up after its timeout
    let mut buf = [0u8; 64];
    let read = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
        .await
        .expect("server kept the silent connection open");
    assert!(matches!(read, Ok(0) | Err(_)));
    assert_eq!(server.state.registry().game_count(), 0);
}

#[tokio::test]
async fn test_shutdown_closes_open_sessions() {
    let server = TestServer::start().await.expect("Failed to start server");
    let token = server.session_token("steve").unwrap();
    let mut game = server.connect_game().await.unwrap();
    let mut operator = server.connect_operator(&token).await.unwrap();
    let state = server.state.clone();

    server.shutdown().await.unwrap();

    assert!(matches!(recv_message(&mut game).await.unwrap(), Message::Close(_)));
    assert!(matches!(
        recv_message(&mut operator).await.unwrap(),
        Message::Close(_)
    ));
    assert!(state.is_shutting_down());
}

#[tokio::test]
async fn test_shutdown_stops_listeners() {
    let server = TestServer::start().await.expect("Failed to start server");
    let game_addr = server.game_addr;

    server.shutdown().await.unwrap();

    let result = tokio_tungstenite::connect_async(format!("ws://{game_addr}")).await;
    assert!(result.is_err());
}

// ============================================================================
// Authorization Tests
// ============================================================================

#[tokio::test]
async fn test_operator_without_session_refused() {
    let server = TestServer::start().await.expect("Failed to start server");

    match server.try_connect_operator(None).await {
        Err(WsError::Http(response)) => assert_eq!(response.status(), 401),
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("unauthorized operator was accepted"),
    }

    assert_eq!(server.state.registry().operator_count(), 0);
}

#[tokio::test]
async fn test_operator_with_forged_session_refused() {
    let server = TestServer::start().await.expect("Failed to start server");
    let forged = bridge_common::SessionService::new("some-other-secret", 600)
        .issue(&bridge_common::OperatorPrincipal::new("1", "mallory"))
        .unwrap();

    match server.try_connect_operator(Some(&forged)).await {
        Err(WsError::Http(response)) => assert_eq!(response.status(), 401),
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("forged session was accepted"),
    }

    assert_eq!(server.state.registry().operator_count(), 0);
}

#[tokio::test]
async fn test_refused_operator_receives_nothing() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut game = server.connect_game().await.unwrap();
    let _ = server.try_connect_operator(None).await;

    game.send(Message::Text("secret".into())).await.unwrap();
    assert_eq!(server.state.registry().operator_count(), 0);
    assert_silent(&mut game).await.unwrap();
}

// ============================================================================
// Web Surface Tests
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await.expect("Failed to start server");
    let response = server.get("/health").await.expect("Request failed");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_protected_pages_redirect_to_login() {
    let server = TestServer::start().await.expect("Failed to start server");

    for path in ["/", "/me", "/index.html"] {
        let response = server.get(path).await.expect("Request failed");
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{path}");
        assert_eq!(response.headers()["location"], "/login", "{path}");
    }
}

#[tokio::test]
async fn test_me_with_bearer_token() {
    let server = TestServer::start().await.expect("Failed to start server");
    let token = server.session_token("steve").unwrap();

    let response = server.get_auth("/me", &token).await.expect("Request failed");
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["username"], "steve");
    assert_eq!(body["id"], "id-steve");
}

#[tokio::test]
async fn test_login_flow_starts_at_provider() {
    let server = TestServer::start().await.expect("Failed to start server");
    let response = server.get("/auth/discord").await.expect("Request failed");

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()["location"].to_str().unwrap();
    assert!(location.starts_with("https://id.test/authorize?state="));
}
