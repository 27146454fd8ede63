// ============================
// crates/backend-lib/tests/ws_transport.rs
// ============================
//! Integration tests over real WebSocket connections.

mod common;

use codecollab_common::{ClientToServer, ServerToClient};
use common::{connect, eventually, next_event, send, setup_server};
use futures_util::SinkExt;
use tokio_tungstenite::tungstenite::Message;

fn join(room_id: &str) -> ClientToServer {
    ClientToServer::JoinRoom {
        room_id: room_id.to_string(),
    }
}

#[tokio::test]
async fn test_join_edit_and_disconnect() {
    let server = setup_server().await;
    let mut a = connect(server.addr).await;
    let mut b = connect(server.addr).await;

    send(&mut a, &join("live")).await;
    assert!(matches!(
        next_event(&mut a, "A initial data").await,
        ServerToClient::InitialData { .. }
    ));
    let ServerToClient::UserJoined { users, .. } = next_event(&mut a, "A joined").await else {
        panic!("Expected UserJoined");
    };
    assert_eq!(users.len(), 1);

    send(&mut b, &join("live")).await;
    assert!(matches!(
        next_event(&mut b, "B initial data").await,
        ServerToClient::InitialData { .. }
    ));
    for (client, who) in [(&mut a, "A"), (&mut b, "B")] {
        match next_event(client, who).await {
            ServerToClient::UserJoined { users, .. } => assert_eq!(users.len(), 2),
            other => panic!("{who}: expected UserJoined, got {other:?}"),
        }
    }

    // Language changes go to the others only
    send(
        &mut a,
        &ClientToServer::LanguageChange {
            room_id: "live".to_string(),
            language_id: "python".to_string(),
        },
    )
    .await;
    send(
        &mut a,
        &ClientToServer::CodeChange {
            room_id: "live".to_string(),
            code: "print(1)".to_string(),
            language_id: None,
            file_path: Some("main.js".to_string()),
        },
    )
    .await;

    assert_eq!(
        next_event(&mut b, "B language").await,
        ServerToClient::LanguageChange {
            room_id: "live".to_string(),
            language_id: "python".to_string(),
        }
    );
    let update = ServerToClient::CodeUpdate {
        room_id: "live".to_string(),
        code: "print(1)".to_string(),
        language_id: "python".to_string(),
        file_path: Some("main.js".to_string()),
    };
    assert_eq!(next_event(&mut b, "B update").await, update);
    // A skips straight to the update: it never heard its own language change
    assert_eq!(next_event(&mut a, "A update").await, update);

    a.close(None).await.unwrap();
    match next_event(&mut b, "B user left").await {
        ServerToClient::UserLeft { users, .. } => assert_eq!(users.len(), 1),
        other => panic!("Expected UserLeft, got {other:?}"),
    }
    assert!(server.state.gateway.registry().contains("live"));

    b.close(None).await.unwrap();
    let registry = server.state.gateway.registry();
    eventually("room removal", || !registry.contains("live")).await;
    eventually("connections closed", || server.state.gateway.hub().is_empty()).await;
}

#[tokio::test]
async fn test_malformed_and_binary_frames() {
    let server = setup_server().await;
    let mut client = connect(server.addr).await;

    client
        .send(Message::Text("{\"msgType\":\"nope\"}".into()))
        .await
        .unwrap();
    assert!(matches!(
        next_event(&mut client, "malformed reply").await,
        ServerToClient::MalformedMessage { .. }
    ));

    client
        .send(Message::Binary(vec![1, 2, 3].into()))
        .await
        .unwrap();
    assert!(matches!(
        next_event(&mut client, "binary reply").await,
        ServerToClient::MalformedMessage { .. }
    ));

    // The connection survives both
    send(&mut client, &join("still-here")).await;
    assert!(matches!(
        next_event(&mut client, "initial data").await,
        ServerToClient::InitialData { .. }
    ));
}

#[tokio::test]
async fn test_validation_error_reply() {
    let server = setup_server().await;
    let mut client = connect(server.addr).await;

    send(&mut client, &join(&"x".repeat(500))).await;
    match next_event(&mut client, "validation error").await {
        ServerToClient::Error { code, .. } => assert_eq!(code, "VALIDATION_ERROR"),
        other => panic!("Expected Error, got {other:?}"),
    }
    assert!(server.state.gateway.registry().is_empty());
}
