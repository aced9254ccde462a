//! WebSocket Connection Handler
//!
//! Owns the per-connection lifecycle: `Accepted -> Identified -> Closing ->
//! Closed`. A connection identifies with a HELLO frame carrying its user id
//! and login-session id; until then the only thing the gateway does with its
//! frames is ignore them. After identification the connection is registered,
//! receives its catch-up snapshot, and enters the dispatch loop.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::timeout;
use uuid::Uuid;

use super::messages::{AckMessagesPayload, CatchUpSnapshot, EventFrame, HelloPayload, OpCode};
use super::registry::{ConnectionHandle, SocketCommand};
use crate::domain::UnreadStore;
use crate::infrastructure::metrics;
use crate::startup::AppState;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.max_message_size(state.settings.websocket.max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle one WebSocket connection from accept to cleanup
async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4();
    metrics::connection_opened("connected");

    tracing::debug!(connection_id = %connection_id, "New WebSocket connection");

    // Split socket for concurrent read/write
    let (mut sender, mut receiver) = socket.split();

    // The writer task owns the sink; everything else reaches the transport
    // through this channel, which is the handle's send/close capability.
    let (tx, mut rx) = mpsc::unbounded_channel::<SocketCommand>();

    let writer_task = tokio::spawn(async move {
        while let Some(cmd) = rx.recv().await {
            match cmd {
                SocketCommand::Frame(text) => {
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                SocketCommand::Close => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    // Wait for HELLO (with deadline); all other pre-identification frames
    // are ignored.
    let identify_timeout = state.settings.websocket.identify_timeout();
    let identify_result = timeout(identify_timeout, async {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    let frame: EventFrame = match serde_json::from_str(&text) {
                        Ok(frame) => frame,
                        Err(e) => {
                            tracing::debug!(
                                connection_id = %connection_id,
                                error = %e,
                                "Dropping malformed frame before identification"
                            );
                            continue;
                        }
                    };
                    if frame.op == OpCode::Hello as u8 {
                        if let Some(d) = frame.d {
                            if let Ok(hello) = serde_json::from_value::<HelloPayload>(d) {
                                return Some(hello);
                            }
                        }
                        tracing::debug!(
                            connection_id = %connection_id,
                            "HELLO frame missing id/sessionID"
                        );
                    } else {
                        tracing::debug!(
                            connection_id = %connection_id,
                            op = frame.op,
                            "Ignoring frame before identification"
                        );
                    }
                }
                Ok(Message::Close(_)) => return None,
                Err(_) => return None,
                _ => continue,
            }
        }
        None
    })
    .await;

    let hello = match identify_result {
        Ok(Some(hello)) => hello,
        Ok(None) => {
            tracing::debug!(connection_id = %connection_id, "Connection closed before HELLO");
            metrics::connection_closed("connected");
            writer_task.abort();
            return;
        }
        Err(_) => {
            tracing::debug!(connection_id = %connection_id, "Identification timeout");
            let _ = tx.send(SocketCommand::Close);
            tokio::time::sleep(Duration::from_millis(100)).await;
            metrics::connection_closed("connected");
            writer_task.abort();
            return;
        }
    };

    // Register through the session gate; an older connection for the same
    // login session is superseded here.
    let handle = Arc::new(ConnectionHandle::new(
        connection_id,
        hello.id,
        hello.session_id,
        tx.clone(),
    ));
    state.session_gate.admit(handle.clone());
    metrics::connection_opened("identified");

    tracing::info!(
        user_id = %handle.user_id(),
        connection_id = %connection_id,
        "User connected and identified"
    );

    // Catch-up snapshot so the client can reconcile state missed while
    // offline. Store calls happen here, never under a registry lock.
    let snapshot = build_catchup_snapshot(state.store.as_ref(), handle.user_id()).await;
    match serde_json::to_value(&snapshot) {
        Ok(value) => send_frame(&handle, &EventFrame::new(OpCode::Hello, value)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize catch-up snapshot")
        }
    }

    // Dispatch loop: inbound frames only. Outbound traffic flows through the
    // writer task, fed by the event router and the handlers below.
    loop {
        match receiver.next().await {
            Some(Ok(Message::Text(text))) => {
                if let Err(e) = handle_frame(&text, &state, &handle).await {
                    tracing::debug!(
                        connection_id = %connection_id,
                        error = %e,
                        "Error handling frame"
                    );
                }
            }
            Some(Ok(Message::Close(_))) | None => {
                tracing::debug!(connection_id = %connection_id, "Connection closed");
                break;
            }
            Some(Ok(Message::Ping(_))) => {
                // Pong is handled automatically by axum
            }
            Some(Err(e)) => {
                tracing::debug!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
            _ => {}
        }
    }

    // Single cleanup path, regardless of what ended the loop. The registry
    // unregister is idempotent, so racing the heartbeat monitor is safe.
    state.registry.unregister(handle.user_id(), connection_id);
    metrics::connection_closed("identified");
    metrics::connection_closed("connected");
    writer_task.abort();

    tracing::info!(
        user_id = %handle.user_id(),
        connection_id = %connection_id,
        "User disconnected"
    );
}

/// Handle one inbound frame from an identified connection
async fn handle_frame(
    text: &str,
    state: &AppState,
    handle: &Arc<ConnectionHandle>,
) -> Result<(), String> {
    let frame: EventFrame =
        serde_json::from_str(text).map_err(|e| format!("Invalid JSON: {}", e))?;

    match frame.op {
        op if op == OpCode::Ping as u8 => {
            handle.touch();
            send_frame(handle, &EventFrame::bare(OpCode::Pong));
            tracing::trace!(
                connection_id = %handle.connection_id(),
                "Heartbeat received"
            );
        }

        op if op == OpCode::AckMessages as u8 => {
            let d = frame.d.ok_or("Missing ACK_MESSAGES payload")?;
            let ack: AckMessagesPayload =
                serde_json::from_value(d).map_err(|e| format!("Invalid ACK payload: {}", e))?;

            if let Err(e) = state.store.clear_unread(handle.user_id(), &ack.channel_id).await {
                tracing::warn!(
                    user_id = %handle.user_id(),
                    channel_id = %ack.channel_id,
                    error = %e,
                    "Failed to clear unread state"
                );
            }

            // Echo to every connection of the user so other tabs clear
            // their badges too.
            state.router.send_to_user(
                handle.user_id(),
                &EventFrame::new(
                    OpCode::AckMessagesReceived,
                    json!({ "channelID": ack.channel_id }),
                ),
            );
        }

        op if op == OpCode::CallCreate as u8
            || op == OpCode::CallData as u8
            || op == OpCode::CallEnd as u8 =>
        {
            // Signaling relay: payload semantics are opaque, only the
            // channelID matters for addressing.
            let d = frame.d.as_ref().ok_or("Missing signaling payload")?;
            let channel_id = d
                .get("channelID")
                .and_then(|v| v.as_str())
                .ok_or("Signaling payload missing channelID")?;

            match state
                .store
                .channel_recipients(channel_id, handle.user_id())
                .await
            {
                Ok(recipients) => state.router.send_to_users(&recipients, &frame),
                Err(e) => {
                    tracing::warn!(
                        channel_id = %channel_id,
                        error = %e,
                        "Cannot resolve signaling recipients"
                    );
                }
            }
        }

        other => {
            tracing::debug!(
                connection_id = %handle.connection_id(),
                op = other,
                "Unhandled opcode"
            );
        }
    }

    Ok(())
}

/// Serialize and push one frame to a single connection
fn send_frame(handle: &Arc<ConnectionHandle>, frame: &EventFrame) {
    match serde_json::to_string(frame) {
        Ok(text) => {
            if !handle.send_text(text) {
                tracing::warn!(
                    connection_id = %handle.connection_id(),
                    op = frame.op,
                    "Write to connection failed"
                );
            }
        }
        Err(e) => tracing::error!(op = frame.op, error = %e, "Failed to serialize frame"),
    }
}

/// Assemble the catch-up snapshot owed to a freshly identified user.
///
/// Store failures degrade to an empty snapshot; the client reconciles over
/// HTTP, and killing the connection would help nobody.
async fn build_catchup_snapshot(store: &dyn UnreadStore, user_id: &str) -> CatchUpSnapshot {
    let unread_messages = match store.count_unread_by_channel(user_id).await {
        Ok(counts) => counts,
        Err(e) => {
            tracing::warn!(user_id = %user_id, error = %e, "Failed to load unread counts");
            Default::default()
        }
    };
    let pending_friend_requests = match store.count_pending_friend_requests(user_id).await {
        Ok(count) => count,
        Err(e) => {
            tracing::warn!(user_id = %user_id, error = %e, "Failed to load pending requests");
            0
        }
    };
    CatchUpSnapshot {
        unread_messages,
        pending_friend_requests,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MockUnreadStore;
    use crate::shared::error::StoreError;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[tokio::test]
    async fn catchup_snapshot_reflects_store_state() {
        let mut store = MockUnreadStore::new();
        store
            .expect_count_unread_by_channel()
            .returning(|_| Ok(HashMap::from([("c1".to_string(), 4u64)])));
        store
            .expect_count_pending_friend_requests()
            .returning(|_| Ok(2));

        let snapshot = build_catchup_snapshot(&store, "u1").await;
        assert_eq!(snapshot.unread_messages.get("c1"), Some(&4));
        assert_eq!(snapshot.pending_friend_requests, 2);
    }

    #[tokio::test]
    async fn catchup_snapshot_degrades_on_store_failure() {
        let mut store = MockUnreadStore::new();
        store
            .expect_count_unread_by_channel()
            .returning(|_| Err(StoreError::Unavailable("down".into())));
        store
            .expect_count_pending_friend_requests()
            .returning(|_| Err(StoreError::Unavailable("down".into())));

        let snapshot = build_catchup_snapshot(&store, "u1").await;
        assert!(snapshot.unread_messages.is_empty());
        assert_eq!(snapshot.pending_friend_requests, 0);
    }
}
