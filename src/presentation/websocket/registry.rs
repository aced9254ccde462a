//! Connection Registry
//!
//! The single shared-mutable hub of the realtime core: a concurrency-safe
//! map from user id to that user's live connections. Everything else
//! (session gate, event router, heartbeat monitor, connection tasks) goes
//! through this type; nothing touches the map directly.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Commands consumed by a connection's writer task.
///
/// This channel is the registry's only view of a transport: it can push a
/// serialized frame or request a close, nothing else. Swapping the transport
/// implementation never touches the registry.
#[derive(Debug)]
pub enum SocketCommand {
    /// Serialized `{op,d}` envelope to write as one text frame.
    Frame(String),
    /// Close the transport and end the writer task.
    Close,
}

/// One live, identified transport connection.
pub struct ConnectionHandle {
    connection_id: Uuid,
    user_id: String,
    login_session_id: String,
    last_seen: Mutex<Instant>,
    tx: mpsc::UnboundedSender<SocketCommand>,
}

impl ConnectionHandle {
    pub fn new(
        connection_id: Uuid,
        user_id: String,
        login_session_id: String,
        tx: mpsc::UnboundedSender<SocketCommand>,
    ) -> Self {
        Self {
            connection_id,
            user_id,
            login_session_id,
            last_seen: Mutex::new(Instant::now()),
            tx,
        }
    }

    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn login_session_id(&self) -> &str {
        &self.login_session_id
    }

    /// One delivery attempt. Returns `false` if the writer task is gone;
    /// callers log and move on, the monitor reaps the handle later.
    pub fn send_text(&self, frame: String) -> bool {
        self.tx.send(SocketCommand::Frame(frame)).is_ok()
    }

    /// Request transport close. Safe to call any number of times, on dead
    /// connections included.
    pub fn close(&self) {
        let _ = self.tx.send(SocketCommand::Close);
    }

    /// Refresh the liveness timestamp (identification and PING).
    pub fn touch(&self) {
        *self.last_seen.lock() = Instant::now();
    }

    pub fn is_stale(&self, timeout: Duration) -> bool {
        self.last_seen.lock().elapsed() > timeout
    }

    /// Rewind `last_seen`, simulating a silent connection.
    #[cfg(test)]
    pub(crate) fn backdate(&self, by: Duration) {
        let mut last_seen = self.last_seen.lock();
        *last_seen = *last_seen - by;
    }
}

/// Visitor verdict for [`ConnectionRegistry::for_each_connection`].
pub enum Sweep {
    Keep,
    Remove,
}

/// Concurrency-safe `user_id -> connections` map.
///
/// DashMap gives per-shard locking; per-user vectors are only ever mutated
/// while the shard guard is held, so inserts and removals never interleave.
/// Critical sections are short and never await.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<String, Vec<Arc<ConnectionHandle>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a handle into its owner's set, creating the set if absent.
    ///
    /// The `entry` API performs the read-modify-write under the shard lock,
    /// so a concurrent register for the same user cannot be lost.
    pub fn register(&self, handle: Arc<ConnectionHandle>) {
        let user_id = handle.user_id().to_string();
        self.connections.entry(user_id).or_default().push(handle);
    }

    /// Insert a handle, evicting every existing handle that shares its
    /// login session. Drain and push happen in one critical section under
    /// the user's shard lock, so two racing inserts for the same session
    /// cannot both survive; the loser is returned for the caller to close
    /// outside the lock.
    pub fn register_superseding(
        &self,
        handle: Arc<ConnectionHandle>,
    ) -> Vec<Arc<ConnectionHandle>> {
        let user_id = handle.user_id().to_string();
        let session_id = handle.login_session_id().to_string();
        let mut entry = self.connections.entry(user_id).or_default();
        let mut evicted = Vec::new();
        entry.retain(|existing| {
            if existing.login_session_id() == session_id
                && existing.connection_id() != handle.connection_id()
            {
                evicted.push(existing.clone());
                false
            } else {
                true
            }
        });
        entry.push(handle);
        evicted
    }

    /// Remove the matching handle if present. A no-op when the handle is
    /// already gone, which makes racing cleanup paths (peer close vs.
    /// heartbeat eviction) safe to run twice.
    pub fn unregister(&self, user_id: &str, connection_id: Uuid) {
        let mut now_empty = false;
        if let Some(mut conns) = self.connections.get_mut(user_id) {
            conns.retain(|handle| handle.connection_id() != connection_id);
            now_empty = conns.is_empty();
        }
        // Prune outside the get_mut guard; re-check emptiness in case a
        // register slipped in between.
        if now_empty {
            self.connections.remove_if(user_id, |_, conns| conns.is_empty());
        }
    }

    /// Point-in-time snapshot of a user's live connections. Cloned Arcs, so
    /// callers never iterate the protected vector itself. Offline users get
    /// an empty vec without allocating an entry.
    pub fn list_connections(&self, user_id: &str) -> Vec<Arc<ConnectionHandle>> {
        self.connections
            .get(user_id)
            .map(|conns| conns.clone())
            .unwrap_or_default()
    }

    /// Visit every `(user_id, handle)` pair; the visitor may remove the
    /// current entry by returning [`Sweep::Remove`]. Used by the heartbeat
    /// monitor, which takes the same synchronization path as every other
    /// mutator.
    pub fn for_each_connection<F>(&self, mut visitor: F)
    where
        F: FnMut(&str, &Arc<ConnectionHandle>) -> Sweep,
    {
        self.connections.retain(|user_id, conns| {
            conns.retain(|handle| matches!(visitor(user_id, handle), Sweep::Keep));
            !conns.is_empty()
        });
    }

    /// Total live connections across all users.
    pub fn connection_count(&self) -> usize {
        self.connections.iter().map(|entry| entry.len()).sum()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Handle wired to a capturable command channel.
    pub fn handle_with_rx(
        user_id: &str,
        session_id: &str,
    ) -> (
        Arc<ConnectionHandle>,
        mpsc::UnboundedReceiver<SocketCommand>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Arc::new(ConnectionHandle::new(
            Uuid::new_v4(),
            user_id.to_string(),
            session_id.to_string(),
            tx,
        ));
        (handle, rx)
    }

    /// Handle whose transport is already gone (receiver dropped).
    pub fn dead_handle(user_id: &str, session_id: &str) -> Arc<ConnectionHandle> {
        let (handle, _rx) = handle_with_rx(user_id, session_id);
        handle
    }
}
