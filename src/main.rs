//! Line Chat Relay - Entry Point
//!
//! Parses configuration, binds the TCP listener and serves until Ctrl-C.

use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use chat_relay::{serve, AppError, ChatConfig};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chat_relay=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chat_relay=info")),
        )
        .init();

    let config = ChatConfig::parse();

    let listener = TcpListener::bind(&config.addr).await?;
    info!("Chat relay listening on {}", config.addr);
    info!(
        "Idle timeout {:?}, outbound capacity {}, hub capacity {}, full queue policy {:?}",
        config.idle_timeout(),
        config.outbound_capacity,
        config.hub_capacity,
        config.full_queue_policy
    );

    let shutdown = CancellationToken::new();
    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, shutting down");
                ctrl_c.cancel();
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    serve(listener, config, shutdown).await;
    Ok(())
}
