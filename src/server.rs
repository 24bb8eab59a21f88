//! Accept loop
//!
//! Starts the Hub actor, accepts TCP connections and hands each one to
//! `handle_connection`. Accept errors are logged and the loop continues.

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info};

use crate::config::ChatConfig;
use crate::handler::handle_connection;
use crate::hub;

/// Serve connections on `listener` until `shutdown` is cancelled
///
/// On shutdown every session is closed through its normal teardown, and
/// this returns once all sessions and the Hub have finished.
pub async fn serve(listener: TcpListener, config: ChatConfig, shutdown: CancellationToken) {
    let (hub, hub_actor) = hub::channel(config.hub_capacity, config.full_queue_policy);
    let hub_task = tokio::spawn(hub_actor.run());
    info!("Hub actor started");

    let settings = config.session_settings();
    let sessions = TaskTracker::new();

    loop {
        let accepted = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((stream, addr)) => {
                info!("New connection from {}", addr);
                let hub = hub.clone();
                let shutdown = shutdown.clone();

                sessions.spawn(async move {
                    if let Err(e) =
                        handle_connection(stream, addr.to_string(), hub, settings, shutdown).await
                    {
                        error!("Connection handler error: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }

    info!("Stopped accepting, waiting for {} sessions", sessions.len());
    sessions.close();
    sessions.wait().await;

    // Last handle gone: the Hub loop ends.
    drop(hub);
    if let Err(e) = hub_task.await {
        error!("Hub task failed: {}", e);
    }
    info!("Server stopped");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpStream;
    use tokio::time::timeout;

    use super::*;
    use crate::message::WELCOME_TEXT;

    const STEP: Duration = Duration::from_secs(5);

    async fn start() -> (std::net::SocketAddr, CancellationToken, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let server = tokio::spawn(serve(listener, ChatConfig::default(), shutdown.clone()));
        (addr, shutdown, server)
    }

    #[tokio::test]
    async fn test_relay_over_tcp() {
        let (addr, shutdown, server) = start().await;

        let (a_read, mut a_write) = TcpStream::connect(addr).await.unwrap().into_split();
        let (b_read, mut b_write) = TcpStream::connect(addr).await.unwrap().into_split();
        let mut a_lines = BufReader::new(a_read).lines();
        let mut b_lines = BufReader::new(b_read).lines();

        assert_eq!(a_lines.next_line().await.unwrap().as_deref(), Some(WELCOME_TEXT));
        assert_eq!(b_lines.next_line().await.unwrap().as_deref(), Some(WELCOME_TEXT));

        // The welcome can arrive before the join is processed; A hearing B
        // proves both have joined.
        let ping = loop {
            b_write.write_all(b"ping\n").await.unwrap();
            if let Ok(line) = timeout(Duration::from_millis(100), a_lines.next_line()).await {
                break line.unwrap().unwrap();
            }
        };
        let (b_id, text) = ping.split_once(':').unwrap();
        let b_id = b_id.to_string();
        assert!(b_id.parse::<u64>().is_ok());
        assert_eq!(text, "ping");

        a_write.write_all(b"hello\r\n").await.unwrap();
        let hello = timeout(STEP, b_lines.next_line()).await.unwrap().unwrap().unwrap();
        let (a_id, text) = hello.split_once(':').unwrap();
        assert_ne!(a_id, b_id);
        assert_eq!(text, "hello");

        a_write.shutdown().await.unwrap();
        let left = timeout(STEP, b_lines.next_line()).await.unwrap().unwrap().unwrap();
        assert_eq!(left, format!("user `{}` has left.", a_id));

        // Only late pings may still be queued for A before its stream ends.
        while let Some(line) = timeout(STEP, a_lines.next_line()).await.unwrap().unwrap() {
            assert_eq!(line, format!("{}:ping", b_id));
        }

        shutdown.cancel();
        timeout(STEP, server).await.unwrap().unwrap();
        assert!(timeout(STEP, b_lines.next_line()).await.unwrap().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_shutdown_with_no_sessions() {
        let (_addr, shutdown, server) = start().await;
        shutdown.cancel();
        timeout(STEP, server).await.unwrap().unwrap();
    }
}
