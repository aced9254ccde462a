//! Application Startup
//!
//! Application building and server initialization. The registry, session
//! gate, event router, and heartbeat monitor are constructed once here and
//! threaded through explicitly; there is no global connection map.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::Settings;
use crate::domain::UnreadStore;
use crate::presentation::http::routes;
use crate::presentation::websocket::{
    ConnectionRegistry, EventRouter, HeartbeatMonitor, SessionGate,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ConnectionRegistry>,
    pub session_gate: Arc<SessionGate>,
    pub router: Arc<EventRouter>,
    pub store: Arc<dyn UnreadStore>,
    pub settings: Arc<Settings>,
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
    state: AppState,
}

impl Application {
    /// Build the application from settings and a data-store collaborator
    pub async fn build(settings: Settings, store: Arc<dyn UnreadStore>) -> Result<Self> {
        // Connection registry, shared by every realtime component
        let registry = Arc::new(ConnectionRegistry::new());
        let session_gate = Arc::new(SessionGate::new(registry.clone()));
        let event_router = Arc::new(EventRouter::new(registry.clone()));

        // Heartbeat monitor runs detached for the process lifetime
        let _ = HeartbeatMonitor::new(
            registry.clone(),
            settings.websocket.sweep_interval(),
            settings.websocket.heartbeat_timeout(),
        )
        .spawn();
        tracing::info!(
            sweep_interval_ms = settings.websocket.heartbeat_sweep_interval_ms,
            timeout_ms = settings.websocket.heartbeat_timeout_ms,
            "Heartbeat monitor started"
        );

        // Create app state
        let state = AppState {
            registry,
            session_gate,
            router: event_router,
            store,
            settings: Arc::new(settings.clone()),
        };

        // Build router with middleware
        let router = routes::create_router(state.clone())
            .layer(TraceLayer::new_for_http())
            .layer(routes::create_cors_layer(&settings.cors));

        // Bind to address
        let addr = settings.server.socket_addr();
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            router,
            state,
        })
    }

    /// Run the server until stopped
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(self.listener, self.router).await?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Shared state, exposed so an embedding service can reach the event
    /// router (and tests can observe the registry)
    pub fn state(&self) -> AppState {
        self.state.clone()
    }
}
