//! Common Test Utilities
//!
//! Spawns a real gateway on an ephemeral port and provides WebSocket client
//! helpers for driving the identify handshake.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use chat_gateway::config::{CorsSettings, ServerSettings, Settings, WebSocketSettings};
use chat_gateway::infrastructure::MemoryStore;
use chat_gateway::startup::{AppState, Application};

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestApp {
    pub addr: SocketAddr,
    pub store: Arc<MemoryStore>,
    pub state: AppState,
}

/// Settings tuned for tests: ephemeral port, generous heartbeat timeout so
/// connections are only evicted when a test opts into a short timeout.
pub fn test_settings() -> Settings {
    Settings {
        server: ServerSettings {
            host: "127.0.0.1".into(),
            port: 0,
        },
        websocket: WebSocketSettings {
            max_message_size: 65536,
            heartbeat_sweep_interval_ms: 30_000,
            heartbeat_timeout_ms: 60_000,
            identify_timeout_secs: 5,
        },
        cors: CorsSettings {
            allowed_origins: vec![],
        },
        environment: "test".into(),
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_settings()).await
}

pub async fn spawn_app_with(settings: Settings) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let app = Application::build(settings, store.clone())
        .await
        .expect("failed to build test application");
    let addr = app.local_addr().expect("listener has no local addr");
    let state = app.state();
    tokio::spawn(app.run_until_stopped());
    TestApp { addr, store, state }
}

impl TestApp {
    pub fn ws_url(&self) -> String {
        format!("ws://{}/gateway", self.addr)
    }

    pub async fn connect(&self) -> WsClient {
        let (ws, _) = connect_async(self.ws_url())
            .await
            .expect("failed to connect to gateway");
        ws
    }

    /// Connect and run the HELLO handshake, returning the socket and the
    /// catch-up snapshot payload.
    pub async fn connect_identified(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> (WsClient, serde_json::Value) {
        let mut ws = self.connect().await;
        send_json(
            &mut ws,
            serde_json::json!({ "op": 0, "d": { "id": user_id, "sessionID": session_id } }),
        )
        .await;
        let reply = next_json(&mut ws).await;
        assert_eq!(reply["op"], 0, "expected HELLO reply, got {reply}");
        let snapshot = reply["d"].clone();
        (ws, snapshot)
    }
}

pub async fn send_json(ws: &mut WsClient, value: serde_json::Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .expect("failed to send frame");
}

/// Next text frame as JSON; panics after 5 seconds.
pub async fn next_json(ws: &mut WsClient) -> serde_json::Value {
    let deadline = Duration::from_secs(5);
    loop {
        let msg = tokio::time::timeout(deadline, ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended while waiting for frame")
            .expect("websocket error while waiting for frame");
        if msg.is_text() {
            let text = msg.into_text().unwrap();
            return serde_json::from_str(&text).expect("frame was not valid JSON");
        }
    }
}

/// Assert no text frame arrives within `quiet` (close frames excepted).
pub async fn expect_silence(ws: &mut WsClient, quiet: Duration) {
    let outcome = tokio::time::timeout(quiet, async {
        while let Some(msg) = ws.next().await {
            if msg.map(|m| m.is_text()).unwrap_or(false) {
                return true;
            }
        }
        false
    })
    .await;
    assert!(
        !matches!(outcome, Ok(true)),
        "expected no frames, but one arrived"
    );
}

/// Wait until the socket is closed by the server; panics after 5 seconds.
pub async fn expect_server_close(ws: &mut WsClient) {
    let deadline = Duration::from_secs(5);
    let outcome = tokio::time::timeout(deadline, async {
        while let Some(msg) = ws.next().await {
            match msg {
                Ok(m) if m.is_close() => return true,
                Ok(_) => continue,
                Err(_) => return true, // connection torn down
            }
        }
        true // stream ended
    })
    .await;
    assert!(outcome.unwrap_or(false), "server did not close the socket");
}
