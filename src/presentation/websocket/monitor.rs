//! Heartbeat Monitor
//!
//! Transport-level disconnects are not always observable promptly; an idle
//! socket can look open long after the peer vanished. The monitor is the
//! single source of truth for reclaiming abandoned connections: a periodic
//! sweep closes and removes every connection silent for longer than the
//! timeout, bounding registry growth.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use super::registry::{ConnectionRegistry, Sweep};
use crate::infrastructure::metrics;

pub struct HeartbeatMonitor {
    registry: Arc<ConnectionRegistry>,
    sweep_interval: Duration,
    timeout: Duration,
}

impl HeartbeatMonitor {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        sweep_interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            sweep_interval,
            timeout,
        }
    }

    /// Run the sweep on a fixed period for the life of the process.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.sweep_interval);
            ticker.tick().await; // Skip first immediate tick
            loop {
                ticker.tick().await;
                self.sweep();
            }
        })
    }

    /// One pass over every registered connection. Closing an already-dead
    /// transport is a no-op, so the sweep always completes.
    pub fn sweep(&self) -> usize {
        let mut evicted = 0usize;
        self.registry.for_each_connection(|user_id, handle| {
            if handle.is_stale(self.timeout) {
                tracing::info!(
                    user_id = %user_id,
                    connection_id = %handle.connection_id(),
                    "Heartbeat timeout, evicting connection"
                );
                handle.close();
                evicted += 1;
                Sweep::Remove
            } else {
                Sweep::Keep
            }
        });
        if evicted > 0 {
            metrics::HEARTBEAT_EVICTIONS_TOTAL.inc_by(evicted as u64);
            tracing::debug!(evicted, "Heartbeat sweep complete");
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::super::registry::test_support::*;
    use super::super::registry::SocketCommand;
    use super::*;
    use pretty_assertions::assert_eq;

    const TIMEOUT: Duration = Duration::from_millis(60_000);

    fn monitor(registry: &Arc<ConnectionRegistry>) -> HeartbeatMonitor {
        HeartbeatMonitor::new(registry.clone(), Duration::from_millis(30_000), TIMEOUT)
    }

    #[tokio::test]
    async fn stale_connection_is_closed_and_removed() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (stale, mut stale_rx) = handle_with_rx("u1", "s1");
        stale.backdate(Duration::from_millis(70_000));
        registry.register(stale);

        let evicted = monitor(&registry).sweep();

        assert_eq!(evicted, 1);
        assert!(registry.list_connections("u1").is_empty());
        assert!(matches!(stale_rx.try_recv(), Ok(SocketCommand::Close)));
    }

    #[tokio::test]
    async fn fresh_connection_survives_the_sweep() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (fresh, mut fresh_rx) = handle_with_rx("u1", "s1");
        fresh.backdate(Duration::from_millis(10_000));
        registry.register(fresh);

        let evicted = monitor(&registry).sweep();

        assert_eq!(evicted, 0);
        assert_eq!(registry.list_connections("u1").len(), 1);
        assert!(fresh_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn sweep_completes_past_dead_transports() {
        let registry = Arc::new(ConnectionRegistry::new());
        // Writer task already gone; close() on it must not stop the sweep.
        let dead = dead_handle("u1", "s1");
        dead.backdate(Duration::from_millis(90_000));
        registry.register(dead);
        let (stale, _rx) = handle_with_rx("u2", "s1");
        stale.backdate(Duration::from_millis(90_000));
        registry.register(stale);

        let evicted = monitor(&registry).sweep();

        assert_eq!(evicted, 2);
        assert_eq!(registry.connection_count(), 0);
    }

    #[tokio::test]
    async fn ping_refresh_defers_eviction() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (handle, _rx) = handle_with_rx("u1", "s1");
        handle.backdate(Duration::from_millis(70_000));
        handle.touch(); // PING arrived just before the tick
        registry.register(handle);

        assert_eq!(monitor(&registry).sweep(), 0);
        assert_eq!(registry.list_connections("u1").len(), 1);
    }
}
