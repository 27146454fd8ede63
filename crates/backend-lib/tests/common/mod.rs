//! Test utilities for spinning up a real server

use backend_lib::{config::Settings, ws_router, AppState};
use codecollab_common::{ClientToServer, ServerToClient};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::time::{timeout, Duration};
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Running server; dropping the handle shuts it down
pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    _shutdown: oneshot::Sender<()>,
}

pub async fn setup_server() -> TestServer {
    let state = AppState::new(Settings::default()).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();

    let served = state.clone();
    tokio::spawn(async move {
        ws_router::serve(listener, served, async {
            let _ = rx.await;
        })
        .await
        .unwrap();
    });

    TestServer {
        addr,
        state,
        _shutdown: tx,
    }
}

pub async fn connect(addr: SocketAddr) -> Client {
    let (stream, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .expect("Failed to connect");
    stream
}

pub async fn send(client: &mut Client, message: &ClientToServer) {
    let text = serde_json::to_string(message).unwrap();
    client.send(Message::Text(text.into())).await.unwrap();
}

/// Next server event, failing the test after five seconds
pub async fn next_event(client: &mut Client, context: &str) -> ServerToClient {
    loop {
        let frame = timeout(Duration::from_secs(5), client.next())
            .await
            .unwrap_or_else(|_| panic!("Timed out waiting for {context}"))
            .unwrap_or_else(|| panic!("Stream ended waiting for {context}"))
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

/// Poll `check` until it holds, failing the test after five seconds
pub async fn eventually(context: &str, mut check: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !check() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "Timed out waiting for {context}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
