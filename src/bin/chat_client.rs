//! Line Chat Client
//!
//! Connects to a relay, prints everything the server sends and forwards
//! stdin line by line. On stdin EOF the write side is half-closed and the
//! client waits for the server to finish.

use clap::Parser;
use tokio::io::{self, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// Chat client arguments
#[derive(Debug, Parser)]
#[command(name = "chat_client")]
#[command(about = "Connect stdin/stdout to a chat relay")]
struct Args {
    /// Relay address
    #[arg(default_value = "127.0.0.1:2022")]
    addr: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so they never mix with chat output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chat_client=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let stream = TcpStream::connect(&args.addr).await?;
    debug!("Connected to {}", args.addr);

    let (mut reader, mut writer) = stream.into_split();

    let output = tokio::spawn(async move {
        let mut stdout = io::stdout();
        let copied = io::copy(&mut reader, &mut stdout).await;
        debug!("Server closed the connection");
        copied
    });

    io::copy(&mut io::stdin(), &mut writer).await?;
    writer.shutdown().await?;

    if let Err(e) = output.await? {
        warn!("Reading from server failed: {}", e);
    }
    Ok(())
}
