//! # Chat Gateway
//!
//! Real-time presence and fan-out gateway for the chat platform.
//!
//! This is the application entry point that initializes:
//! - Tracing/logging subsystem
//! - Configuration loading
//! - Connection registry and heartbeat monitor
//! - HTTP/WebSocket server

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use chat_gateway::config::Settings;
use chat_gateway::infrastructure::MemoryStore;
use chat_gateway::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for structured logging
    chat_gateway::telemetry::init_tracing();

    info!("Starting Chat Gateway...");

    // Load configuration from environment and config files
    let settings = Settings::load()?;
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        environment = %settings.environment,
        "Configuration loaded"
    );

    // Standalone deployments run against the in-process store; when embedded
    // in the API service, that service supplies its own UnreadStore.
    let store = Arc::new(MemoryStore::new());

    // Build and run the application
    let application = Application::build(settings, store).await?;

    info!("Gateway ready to accept connections");
    application.run_until_stopped().await?;

    Ok(())
}
