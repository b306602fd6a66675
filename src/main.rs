//! Chatroom server - Entry Point
//!
//! Parses the port, binds the listener and serves clients until a fatal error.

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use chatroom::{bind, serve, Args, ServerConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chatroom=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chatroom=info")),
        )
        .init();

    let args = Args::parse();
    let config = ServerConfig::from(&args);

    let listener = bind(&config).map_err(|e| {
        error!("Failed to listen on {}: {}", config.bind_addr, e);
        e
    })?;
    info!("Chatroom listening on {}", config.bind_addr);

    serve(listener, config).await?;
    Ok(())
}
