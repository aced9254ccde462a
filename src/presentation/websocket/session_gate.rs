//! Session Gate
//!
//! Enforces at-most-one-connection-per-(user, login-session). A user may
//! hold many simultaneous connections from different devices or tabs, each
//! under its own login session; conflict is scoped to an identical session
//! id, which models "logging in elsewhere kicks the old tab".

use std::sync::Arc;

use super::registry::{ConnectionHandle, ConnectionRegistry};

pub struct SessionGate {
    registry: Arc<ConnectionRegistry>,
}

impl SessionGate {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Admit a freshly identified connection.
    ///
    /// Supersede and insert happen atomically in the registry, so two
    /// racing admits for the same login session cannot both stay live.
    /// Evicted transports are closed outside the registry lock; their own
    /// cleanup path will unregister again, which is a no-op.
    pub fn admit(&self, handle: Arc<ConnectionHandle>) {
        let evicted = self.registry.register_superseding(handle.clone());
        for old in evicted {
            tracing::info!(
                user_id = %handle.user_id(),
                session_id = %handle.login_session_id(),
                old_connection = %old.connection_id(),
                new_connection = %handle.connection_id(),
                "Superseding connection for re-identified session"
            );
            old.close();
        }
    }
}
