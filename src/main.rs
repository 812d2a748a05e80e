//! Chat Relay Server - Entry Point
//!
//! Loads configuration, starts the listener and runs until killed.

use tracing::info;
use tracing_subscriber::EnvFilter;

use chat_relay::{start_listener, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chat_relay=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chat_relay=info")),
        )
        .init();

    // Port and capacity from config file, env vars or command line
    let config = ServerConfig::load()?;

    // Bind failures end the process here with a non-zero status
    let server = start_listener(config)?;
    info!("Chat relay listening on {}", server.local_addr());

    server.wait().await?;
    Ok(())
}
