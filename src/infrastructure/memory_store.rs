//! In-memory implementation of the data-store collaborator.
//!
//! Backs standalone gateway deployments and the test suite. Mirrors the
//! platform's unread bookkeeping (per-user, per-channel counters plus a
//! pending friend-request counter) without any persistence.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::UnreadStore;
use crate::shared::error::StoreError;

/// DashMap-backed store; every method is a short non-blocking lookup.
#[derive(Default)]
pub struct MemoryStore {
    /// user_id -> channel_id -> unread count
    unread: DashMap<String, HashMap<String, u64>>,
    /// user_id -> pending friend request count
    pending_requests: DashMap<String, u64>,
    /// channel_id -> member user ids
    channel_members: DashMap<String, Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `count` unread messages for a user in a channel.
    pub fn add_unread(&self, user_id: &str, channel_id: &str, count: u64) {
        let mut per_channel = self.unread.entry(user_id.to_string()).or_default();
        *per_channel.entry(channel_id.to_string()).or_insert(0) += count;
    }

    /// Set the pending friend-request count for a user.
    pub fn set_pending_requests(&self, user_id: &str, count: u64) {
        self.pending_requests.insert(user_id.to_string(), count);
    }

    /// Declare the member list of a channel.
    pub fn set_channel_members(&self, channel_id: &str, members: Vec<String>) {
        self.channel_members.insert(channel_id.to_string(), members);
    }
}

#[async_trait]
impl UnreadStore for MemoryStore {
    async fn count_unread_by_channel(
        &self,
        user_id: &str,
    ) -> Result<HashMap<String, u64>, StoreError> {
        Ok(self
            .unread
            .get(user_id)
            .map(|per_channel| per_channel.clone())
            .unwrap_or_default())
    }

    async fn count_pending_friend_requests(&self, user_id: &str) -> Result<u64, StoreError> {
        Ok(self
            .pending_requests
            .get(user_id)
            .map(|count| *count)
            .unwrap_or(0))
    }

    async fn clear_unread(&self, user_id: &str, channel_id: &str) -> Result<(), StoreError> {
        if let Some(mut per_channel) = self.unread.get_mut(user_id) {
            per_channel.remove(channel_id);
        }
        Ok(())
    }

    async fn channel_recipients(
        &self,
        channel_id: &str,
        sender_id: &str,
    ) -> Result<Vec<String>, StoreError> {
        let members = self
            .channel_members
            .get(channel_id)
            .ok_or_else(|| StoreError::UnknownChannel(channel_id.to_string()))?;
        Ok(members
            .iter()
            .filter(|member| member.as_str() != sender_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn unread_counts_accumulate_per_channel() {
        let store = MemoryStore::new();
        store.add_unread("u1", "c1", 2);
        store.add_unread("u1", "c1", 1);
        store.add_unread("u1", "c2", 5);

        let counts = store.count_unread_by_channel("u1").await.unwrap();
        assert_eq!(counts.get("c1"), Some(&3));
        assert_eq!(counts.get("c2"), Some(&5));
    }

    #[tokio::test]
    async fn clear_unread_removes_only_the_acked_channel() {
        let store = MemoryStore::new();
        store.add_unread("u1", "c1", 3);
        store.add_unread("u1", "c2", 1);

        store.clear_unread("u1", "c1").await.unwrap();

        let counts = store.count_unread_by_channel("u1").await.unwrap();
        assert_eq!(counts.get("c1"), None);
        assert_eq!(counts.get("c2"), Some(&1));
    }

    #[tokio::test]
    async fn unknown_user_has_empty_snapshot() {
        let store = MemoryStore::new();
        assert!(store.count_unread_by_channel("ghost").await.unwrap().is_empty());
        assert_eq!(store.count_pending_friend_requests("ghost").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn channel_recipients_excludes_the_sender() {
        let store = MemoryStore::new();
        store.set_channel_members("c1", vec!["u1".into(), "u2".into()]);

        let recipients = store.channel_recipients("c1", "u1").await.unwrap();
        assert_eq!(recipients, vec!["u2".to_string()]);
    }

    #[tokio::test]
    async fn channel_recipients_fails_for_unknown_channel() {
        let store = MemoryStore::new();
        assert!(store.channel_recipients("nope", "u1").await.is_err());
    }
}
