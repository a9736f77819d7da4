//! # Realtime Hub
//!
//! Entry point that initializes:
//! - Tracing/logging subsystem
//! - Configuration loading
//! - Entity store (in-memory or PostgreSQL)
//! - HTTP/WebSocket server

use anyhow::Result;
use tracing::info;

use realtime_hub::config::Settings;
use realtime_hub::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    realtime_hub::telemetry::init_tracing();

    info!("Starting Realtime Hub...");

    let settings = Settings::load()?;
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        store = settings.store.backend.as_str(),
        environment = %settings.environment,
        "Configuration loaded"
    );

    let application = Application::build(settings).await?;

    info!("Server ready to accept connections");
    application.run_until_stopped().await?;

    Ok(())
}
