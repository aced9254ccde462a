//! Data-store collaborator trait.
//!
//! The CRUD side of the platform (messages, channels, friends) lives in an
//! external service. The gateway consumes a narrow read/ack surface from it:
//! enough to build the catch-up snapshot sent after identification, to clear
//! unread state on acknowledgement, and to resolve signaling relay targets.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::shared::error::StoreError;

/// Read/ack interface consumed from the external data store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UnreadStore: Send + Sync {
    /// Unread message counts per channel for one user.
    async fn count_unread_by_channel(
        &self,
        user_id: &str,
    ) -> Result<HashMap<String, u64>, StoreError>;

    /// Number of friend requests awaiting the user's response.
    async fn count_pending_friend_requests(&self, user_id: &str) -> Result<u64, StoreError>;

    /// Mark every message in a channel as read by the user.
    async fn clear_unread(&self, user_id: &str, channel_id: &str) -> Result<(), StoreError>;

    /// Members of a channel other than the sender, used to address relayed
    /// signaling frames.
    async fn channel_recipients(
        &self,
        channel_id: &str,
        sender_id: &str,
    ) -> Result<Vec<String>, StoreError>;
}
