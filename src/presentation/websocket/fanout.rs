//! Event Router
//!
//! Fan-out of server-generated events to every live connection of the
//! addressed user(s). This is the surface the external API layer calls
//! after committing a data mutation.
//!
//! Delivery is fire-and-forget: one attempt per connection present in the
//! registry snapshot, failures logged and left for the heartbeat monitor to
//! reap. The authoritative state lives in the data store; a client that
//! missed an event reconciles through the catch-up snapshot on reconnect.

use std::sync::Arc;

use super::messages::EventFrame;
use super::registry::ConnectionRegistry;
use crate::infrastructure::metrics;

pub struct EventRouter {
    registry: Arc<ConnectionRegistry>,
}

impl EventRouter {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Push `frame` to every connection the user holds right now.
    ///
    /// The recipient set is fixed at snapshot time; a connection registered
    /// after the snapshot does not receive this event. A failed write to one
    /// connection never aborts delivery to the others and never reaches the
    /// caller.
    pub fn send_to_user(&self, user_id: &str, frame: &EventFrame) {
        let text = match serde_json::to_string(frame) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(op = frame.op, error = %e, "Failed to serialize event");
                return;
            }
        };

        let snapshot = self.registry.list_connections(user_id);
        let attempts = snapshot.len() as u64;
        for handle in snapshot {
            if !handle.send_text(text.clone()) {
                tracing::warn!(
                    user_id = %user_id,
                    connection_id = %handle.connection_id(),
                    op = frame.op,
                    "Delivery attempt failed; connection awaits reaping"
                );
            }
        }
        if attempts > 0 {
            metrics::record_dispatch(frame.op, attempts);
        }
    }

    /// Convenience fan-out to several users. No ordering guarantee between
    /// addressees; each is served from its own snapshot.
    pub fn send_to_users<I, S>(&self, user_ids: I, frame: &EventFrame)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for user_id in user_ids {
            self.send_to_user(user_id.as_ref(), frame);
        }
    }
}
