//! Gateway Wire Protocol
//!
//! Both directions share one JSON envelope: `{"op": <u8>, "d": <payload>}`.
//! Opcodes 3-11 are produced by the external API layer after it commits a
//! mutation; the gateway relays their payloads opaquely.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Gateway opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    /// Identify (client -> gateway), catch-up snapshot (gateway -> client)
    Hello = 0,
    /// Heartbeat refresh
    Ping = 1,
    /// Heartbeat acknowledgement
    Pong = 2,
    /// Message created
    MessageCreate = 3,
    /// Message edited
    MessageUpdate = 4,
    /// Message deleted
    MessageDelete = 5,
    /// Friend request sent
    FriendReqSend = 6,
    /// Friend request accepted
    FriendReqAccept = 8,
    /// Friend request rejected
    FriendReqReject = 9,
    /// Friend request withdrawn
    FriendReqDelete = 10,
    /// Channel created
    ChannelCreate = 11,
    /// Acknowledge-read for a channel
    AckMessages = 12,
    /// Acknowledge-read echo
    AckMessagesReceived = 13,
    /// Call setup (signaling relay)
    CallCreate = 14,
    /// Call signaling data (opaque relay)
    CallData = 15,
    /// Call teardown (signaling relay)
    CallEnd = 16,
}

/// Wire envelope, inbound and outbound.
///
/// `op` stays a plain integer so frames carrying opcodes this build does not
/// know still deserialize; the dispatcher drops them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventFrame {
    pub op: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<Value>,
}

impl EventFrame {
    pub fn new(op: OpCode, d: Value) -> Self {
        Self {
            op: op as u8,
            d: Some(d),
        }
    }

    /// Payload-less frame (PING/PONG).
    pub fn bare(op: OpCode) -> Self {
        Self {
            op: op as u8,
            d: None,
        }
    }
}

/// HELLO payload (client -> gateway): identifies the connection.
#[derive(Debug, Deserialize)]
pub struct HelloPayload {
    /// Owner user id
    pub id: String,
    /// Login-session identifier (one per browser session cookie)
    #[serde(rename = "sessionID", alias = "loginSessionID")]
    pub session_id: String,
}

/// HELLO response payload (gateway -> client): catch-up snapshot.
#[derive(Debug, Serialize)]
pub struct CatchUpSnapshot {
    #[serde(rename = "unreadMessages")]
    pub unread_messages: std::collections::HashMap<String, u64>,
    #[serde(rename = "pendingFriendRequests")]
    pub pending_friend_requests: u64,
}

/// ACK_MESSAGES payload.
#[derive(Debug, Deserialize)]
pub struct AckMessagesPayload {
    #[serde(rename = "channelID")]
    pub channel_id: String,
}
